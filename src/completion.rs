/// Supplies completion candidates for the text typed so far.
pub trait Completer {
    fn complete(&self, prefix: &str) -> Vec<String>;
}

impl<F> Completer for F
where
    F: Fn(&str) -> Vec<String>,
{
    fn complete(&self, prefix: &str) -> Vec<String> {
        self(prefix)
    }
}

/// A fixed, ordered list of answers; completes on prefix match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Choices(Vec<String>);

impl Choices {
    pub fn new<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(choices.into_iter().map(Into::into).collect())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Completer for Choices {
    fn complete(&self, prefix: &str) -> Vec<String> {
        self.0
            .iter()
            .filter(|choice| choice.starts_with(prefix))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Choices, Completer};
    use pretty_assertions::assert_eq;

    #[test]
    fn choices_filter_by_prefix_in_order() {
        let choices = Choices::new(["red", "green", "grey"]);
        assert_eq!(choices.complete("gr"), vec!["green", "grey"]);
        assert_eq!(choices.complete("r"), vec!["red"]);
        assert!(choices.complete("blue").is_empty());
    }

    #[test]
    fn closures_are_completers() {
        let completer = |prefix: &str| vec![format!("{prefix}!")];
        assert_eq!(completer.complete("hi"), vec!["hi!"]);
    }
}
