use std::fmt;

use url::Url;

/// Suffix the service appends to an account name to form its read-only secondary host.
pub const SECONDARY_SUFFIX: &str = "-secondary";

/// Which replica of the account served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Primary,
    Secondary,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Primary => write!(f, "primary"),
            Endpoint::Secondary => write!(f, "secondary"),
        }
    }
}

/// Primary and secondary blob endpoints of one storage account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountEndpoints {
    pub account: String,
    pub primary: Url,
    pub secondary: Url,
}

impl AccountEndpoints {
    /// Endpoints of `account` in the public cloud.
    pub fn public(account: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            account: account.to_string(),
            primary: Url::parse(&format!("https://{account}.blob.core.windows.net"))?,
            secondary: Url::parse(&format!("https://{account}{SECONDARY_SUFFIX}.blob.core.windows.net"))?,
        })
    }

    /// Replaces either endpoint, e.g. to point at an emulator.
    pub fn with_overrides(mut self, primary: Option<Url>, secondary: Option<Url>) -> Self {
        if let Some(primary) = primary {
            self.primary = primary;
        }
        if let Some(secondary) = secondary {
            self.secondary = secondary;
        }
        self
    }

    /// The substring that identifies a secondary-endpoint URL.
    pub fn secondary_marker(&self) -> String {
        format!("{}{SECONDARY_SUFFIX}", self.account)
    }

    pub fn served_by(&self, url: &Url) -> Endpoint {
        classify_endpoint(url.as_str(), &self.secondary_marker())
    }
}

/// Case-sensitive: a URL is secondary iff it contains `secondary_marker`.
pub fn classify_endpoint(url: &str, secondary_marker: &str) -> Endpoint {
    if url.contains(secondary_marker) {
        Endpoint::Secondary
    } else {
        Endpoint::Primary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_endpoints() {
        let endpoints = AccountEndpoints::public("myaccount").unwrap();
        assert_eq!(endpoints.primary.as_str(), "https://myaccount.blob.core.windows.net/");
        assert_eq!(endpoints.secondary.as_str(), "https://myaccount-secondary.blob.core.windows.net/");
        assert_eq!(endpoints.secondary_marker(), "myaccount-secondary");
    }

    #[test]
    fn test_overrides() {
        let primary = Url::parse("http://127.0.0.1:10000/devstoreaccount1").unwrap();
        let secondary = Url::parse("http://127.0.0.1:10000/devstoreaccount1-secondary").unwrap();
        let endpoints = AccountEndpoints::public("devstoreaccount1")
            .unwrap()
            .with_overrides(Some(primary.clone()), Some(secondary.clone()));
        assert_eq!(endpoints.primary, primary);
        assert_eq!(endpoints.secondary, secondary);

        let url = Url::parse("http://127.0.0.1:10000/devstoreaccount1-secondary/c/b").unwrap();
        assert_eq!(endpoints.served_by(&url), Endpoint::Secondary);
        let url = Url::parse("http://127.0.0.1:10000/devstoreaccount1/c/b").unwrap();
        assert_eq!(endpoints.served_by(&url), Endpoint::Primary);
    }

    #[test]
    fn test_classify_endpoint() {
        let marker = "myaccount-secondary";
        assert_eq!(
            classify_endpoint("https://myaccount-secondary.blob.core.windows.net/c/b", marker),
            Endpoint::Secondary
        );
        assert_eq!(
            classify_endpoint("https://myaccount.blob.core.windows.net/c/b", marker),
            Endpoint::Primary
        );
        // exact match of the whole string still counts as presence
        assert_eq!(classify_endpoint(marker, marker), Endpoint::Secondary);
    }

    #[test]
    fn test_classify_endpoint_is_case_sensitive() {
        let marker = "myaccount-secondary";
        assert_eq!(
            classify_endpoint("https://MYACCOUNT-SECONDARY.blob.core.windows.net/c/b", marker),
            Endpoint::Primary
        );
        assert_eq!(
            classify_endpoint("https://myaccount-Secondary.blob.core.windows.net/c/b", marker),
            Endpoint::Primary
        );
    }
}
