use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid path: '{expression}'. {message} {}", describe_position(.expression, *.position))]
pub struct SyntaxError {
    pub expression: String,
    pub message: String,
    /// Byte offset into `expression` where parsing stopped.
    pub position: usize,
}

impl SyntaxError {
    pub fn new(expression: &str, message: impl Into<String>, position: usize) -> Self {
        Self {
            expression: expression.to_string(),
            message: message.into(),
            position,
        }
    }

    pub fn position_description(&self) -> String {
        describe_position(&self.expression, self.position)
    }
}

fn describe_position(expression: &str, position: usize) -> String {
    if position == 0 {
        "at the beginning of the expression".to_string()
    } else if position >= expression.len() {
        "- expression incomplete".to_string()
    } else {
        let prefix = expression.get(..position).unwrap_or(expression);
        format!("after: '{}'", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_descriptions() {
        assert_eq!(
            SyntaxError::new("a/b", "bad", 0).position_description(),
            "at the beginning of the expression"
        );
        assert_eq!(
            SyntaxError::new("a/", "bad", 2).position_description(),
            "- expression incomplete"
        );
        let err = SyntaxError::new("a/b]", "bad", 3);
        assert_eq!(err.position_description(), "after: 'a/b'");
        assert_eq!(err.to_string(), "Invalid path: 'a/b]'. bad after: 'a/b'");
    }
}
