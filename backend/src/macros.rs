//! Shared macros for the backend crate.

/// Implement `fmt::Debug` for a struct while keeping secrets out of logs.
///
/// Each field is listed with one of:
///
/// - `show field` - printed as-is
/// - `redact field` - printed as `"[REDACTED]"`
/// - `redact_option field` - printed as `Some("[REDACTED]")` or `None`
///
/// ```ignore
/// redacted_debug!(Config {
///     redact database_url,
///     show bind_address,
///     redact_option dashboard_pass,
/// });
/// ```
macro_rules! redacted_debug {
    ($name:ident { $( $kind:ident $field:ident ),* $(,)? }) => {
        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                let mut s = f.debug_struct(stringify!($name));
                $( redacted_debug!(@field s, self, $kind, $field); )*
                s.finish_non_exhaustive()
            }
        }
    };
    (@field $s:ident, $self:ident, show, $field:ident) => {
        $s.field(stringify!($field), &$self.$field);
    };
    (@field $s:ident, $self:ident, redact, $field:ident) => {
        $s.field(stringify!($field), &"[REDACTED]");
    };
    (@field $s:ident, $self:ident, redact_option, $field:ident) => {
        $s.field(stringify!($field), &$self.$field.as_ref().map(|_| "[REDACTED]"));
    };
}

#[cfg(test)]
mod tests {
    #[allow(dead_code)]
    struct LoginAttempt {
        username: String,
        password: String,
        otp: Option<String>,
    }

    redacted_debug!(LoginAttempt {
        show username,
        redact password,
        redact_option otp,
    });

    #[test]
    fn test_password_is_hidden() {
        let attempt = LoginAttempt {
            username: "analyst".to_string(),
            password: "correct horse".to_string(),
            otp: Some("123456".to_string()),
        };
        let output = format!("{:?}", attempt);
        assert!(output.contains("analyst"));
        assert!(!output.contains("correct horse"));
        assert!(!output.contains("123456"));
        assert!(output.contains("Some(\"[REDACTED]\")"));
    }

    #[test]
    fn test_missing_optional_secret_prints_none() {
        let attempt = LoginAttempt {
            username: "analyst".to_string(),
            password: "pw".to_string(),
            otp: None,
        };
        let output = format!("{:?}", attempt);
        assert!(output.contains("otp: None"));
    }
}
