pub type GlazeResult<T> = Result<T, GlazeError>;

#[derive(thiserror::Error, Debug)]
pub enum GlazeError {
    /// Bad request input: missing/unfetchable image URL or undecodable bytes.
    #[error("input error: {0}")]
    Input(String),

    /// Filter name matches no built-in transform and no overlay asset.
    #[error("filter not found: {0}")]
    NotFound(String),

    /// Request is well-formed but rejected by a processing limit.
    #[error("policy error: {0}")]
    Policy(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GlazeError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn policy(msg: impl Into<String>) -> Self {
        Self::Policy(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            GlazeError::input("x").to_string().contains("input error:")
        );
        assert!(
            GlazeError::not_found("x")
                .to_string()
                .contains("filter not found:")
        );
        assert!(
            GlazeError::policy("x")
                .to_string()
                .contains("policy error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = GlazeError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
