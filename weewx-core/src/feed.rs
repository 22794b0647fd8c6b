//! Schema-version check of the primary data feed.
//!
//! The feed is one pipe-delimited record whose first field is an integer
//! version banner. A banner below the supported minimum is reported as
//! [`VersionError::FeedTooOld`], which still carries the remaining fields so
//! the presentation layer can show what it can.

use crate::error::VersionError;

/// Oldest feed schema this client understands.
pub const MIN_FEED_VERSION: u32 = 4000;

#[derive(Debug, Clone, Copy)]
pub struct ProtocolVersionGuard {
    minimum: u32,
}

impl Default for ProtocolVersionGuard {
    fn default() -> Self {
        Self::new(MIN_FEED_VERSION)
    }
}

impl ProtocolVersionGuard {
    pub fn new(minimum: u32) -> Self {
        Self { minimum }
    }

    /// Split the record and validate its banner, returning the fields after it.
    pub fn check(&self, raw: &str) -> Result<Vec<String>, VersionError> {
        let record = raw.trim();
        let mut parts = record.split('|');
        let banner = parts.next().unwrap_or_default().trim();
        let fields: Vec<String> = parts.map(str::to_string).collect();

        let found: u32 = banner
            .parse()
            .map_err(|_| VersionError::MalformedBanner(banner.to_string()))?;

        if found < self.minimum {
            return Err(VersionError::FeedTooOld {
                found,
                minimum: self.minimum,
                fields,
            });
        }

        Ok(fields)
    }
}

/// Feed fields plus the soft warning, if the server is behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedReading {
    pub fields: Vec<String>,
    pub warning: Option<String>,
}

impl FeedReading {
    /// Fold a guard result into a reading; only hard failures stay errors.
    pub fn from_check(result: Result<Vec<String>, VersionError>) -> Result<Self, VersionError> {
        match result {
            Ok(fields) => Ok(Self {
                fields,
                warning: None,
            }),
            Err(err) => match err.degraded_fields() {
                Some(fields) => Ok(Self {
                    fields: fields.to_vec(),
                    warning: Some(err.to_string()),
                }),
                None => Err(err),
            },
        }
    }

    /// Positional field, if the server sent that many.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_version_yields_fields() {
        let guard = ProtocolVersionGuard::default();
        let fields = guard.check("4000|a|b|c").unwrap();

        assert_eq!(fields, vec!["a", "b", "c"]);
    }

    #[test]
    fn older_version_soft_degrades() {
        let guard = ProtocolVersionGuard::default();
        let err = guard.check("3999|a").unwrap_err();

        assert_eq!(
            err,
            VersionError::FeedTooOld {
                found: 3999,
                minimum: 4000,
                fields: vec!["a".to_string()],
            }
        );
        assert!(err.to_string().contains("hasn't updated the Inigo Plugin"));
    }

    #[test]
    fn trailing_newline_and_empty_fields_are_kept_positional() {
        let guard = ProtocolVersionGuard::default();
        let fields = guard.check("4012|1.5||hPa\n").unwrap();

        assert_eq!(fields, vec!["1.5", "", "hPa"]);
    }

    #[test]
    fn non_numeric_banner_is_malformed() {
        let guard = ProtocolVersionGuard::default();

        assert_eq!(
            guard.check("<html>|oops").unwrap_err(),
            VersionError::MalformedBanner("<html>".to_string())
        );
        assert!(matches!(
            guard.check(""),
            Err(VersionError::MalformedBanner(_))
        ));
    }

    #[test]
    fn reading_keeps_fields_and_warning_on_soft_failure() {
        let guard = ProtocolVersionGuard::default();

        let ok = FeedReading::from_check(guard.check("4001|x")).unwrap();
        assert_eq!(ok.field(0), Some("x"));
        assert!(ok.warning.is_none());

        let soft = FeedReading::from_check(guard.check("3000|x|y")).unwrap();
        assert_eq!(soft.fields, vec!["x", "y"]);
        assert!(soft.warning.is_some());
        assert_eq!(soft.field(5), None);

        assert!(FeedReading::from_check(guard.check("abc|x")).is_err());
    }
}
