//! Provider descriptors: list-backend API dialects as data.
//!
//! A descriptor turns a logical operation (subscribe, unsubscribe, check,
//! fetch lists) into the pieces of an HTTP request: verb, endpoint URL,
//! parameter set, and payload encoding. The adapter executes them without
//! ever branching on a provider name; new providers are added by adding a
//! [`ProviderFlavor`] variant, never by editing call sites.

use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::types::{BackendName, ListAddress};

/// HTTP verb a descriptor selects for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// Read-only lookup.
    Get,
    /// Create/add.
    Post,
    /// Remove.
    Delete,
}

/// How request parameters are carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    /// `application/x-www-form-urlencoded` body.
    Form,
    /// JSON object body.
    Json,
}

/// How the adapter authenticates against the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// HTTP basic auth with a fixed admin user and the API key as password.
    Basic,
    /// `Authorization: token <key>` header.
    TokenHeader,
}

/// The supported provider API dialects.
///
/// A closed set: shared logic never branches on these by name, it only asks
/// the flavor for request parts and response interpretations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFlavor {
    /// Mailman-3-style REST core: form-encoded bodies, basic auth,
    /// `DELETE` on the member resource, 404 for unknown members.
    Mailman,
    /// Listmonk-style JSON API: JSON bodies, token-header auth.
    Listmonk,
}

/// One request the adapter should perform, described as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParts {
    /// HTTP verb.
    pub verb: Verb,
    /// Fully built endpoint URL.
    pub url: String,
    /// Body parameters; empty for verbs without a body.
    pub params: Vec<(&'static str, String)>,
    /// Body encoding when `params` is non-empty.
    pub encoding: PayloadEncoding,
}

/// A list as reported by a provider's list-enumeration endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FetchedList {
    /// Fully qualified list address.
    pub address: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Audience language tag.
    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_locale() -> String {
    "en".to_string()
}

/// Immutable description of one configured backend.
#[derive(Debug, Clone)]
pub struct BackendDescriptor {
    /// Name lists use to reference this backend.
    pub name: BackendName,
    /// API dialect.
    pub flavor: ProviderFlavor,
    /// Base API URL without a trailing slash.
    pub base_url: String,
    /// Auth material.
    pub api_key: String,
}

impl BackendDescriptor {
    /// Builds a descriptor from its configuration entry.
    pub fn from_config(config: &BackendConfig) -> Self {
        BackendDescriptor {
            name: config.name.clone(),
            flavor: config.flavor,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// How the adapter must authenticate requests to this backend.
    pub fn auth(&self) -> AuthScheme {
        match self.flavor {
            ProviderFlavor::Mailman => AuthScheme::Basic,
            ProviderFlavor::Listmonk => AuthScheme::TokenHeader,
        }
    }

    /// Request adding `email` to `list`.
    pub fn subscribe_request(
        &self,
        list: &ListAddress,
        email: &str,
        name: Option<&str>,
    ) -> RequestParts {
        match self.flavor {
            ProviderFlavor::Mailman => {
                let mut params = vec![
                    ("list_id", list.as_str().to_string()),
                    ("subscriber", email.to_string()),
                    // The double opt-in already happened on our side.
                    ("pre_verified", "true".to_string()),
                    ("pre_confirmed", "true".to_string()),
                ];
                if let Some(name) = name {
                    params.push(("display_name", name.to_string()));
                }
                RequestParts {
                    verb: Verb::Post,
                    url: format!("{}/members", self.base_url),
                    params,
                    encoding: PayloadEncoding::Form,
                }
            }
            ProviderFlavor::Listmonk => {
                let mut params = vec![
                    ("list", list.as_str().to_string()),
                    ("email", email.to_string()),
                    ("status", "confirmed".to_string()),
                ];
                if let Some(name) = name {
                    params.push(("name", name.to_string()));
                }
                RequestParts {
                    verb: Verb::Post,
                    url: format!("{}/api/subscribers", self.base_url),
                    params,
                    encoding: PayloadEncoding::Json,
                }
            }
        }
    }

    /// Request removing `email` from `list`.
    pub fn unsubscribe_request(&self, list: &ListAddress, email: &str) -> RequestParts {
        match self.flavor {
            ProviderFlavor::Mailman => RequestParts {
                verb: Verb::Delete,
                url: format!("{}/lists/{}/member/{}", self.base_url, list, email),
                params: Vec::new(),
                encoding: PayloadEncoding::Form,
            },
            ProviderFlavor::Listmonk => RequestParts {
                verb: Verb::Delete,
                url: format!(
                    "{}/api/subscribers?list={}&email={}",
                    self.base_url, list, email
                ),
                params: Vec::new(),
                encoding: PayloadEncoding::Json,
            },
        }
    }

    /// Request looking up whether `email` is a member of `list`.
    pub fn check_request(&self, list: &ListAddress, email: &str) -> RequestParts {
        match self.flavor {
            ProviderFlavor::Mailman => RequestParts {
                verb: Verb::Get,
                url: format!("{}/lists/{}/member/{}", self.base_url, list, email),
                params: Vec::new(),
                encoding: PayloadEncoding::Form,
            },
            ProviderFlavor::Listmonk => RequestParts {
                verb: Verb::Get,
                url: format!(
                    "{}/api/subscribers?list={}&email={}",
                    self.base_url, list, email
                ),
                params: Vec::new(),
                encoding: PayloadEncoding::Json,
            },
        }
    }

    /// Request enumerating the backend's lists.
    pub fn lists_request(&self) -> RequestParts {
        let url = match self.flavor {
            ProviderFlavor::Mailman => format!("{}/lists", self.base_url),
            ProviderFlavor::Listmonk => format!("{}/api/lists", self.base_url),
        };
        RequestParts {
            verb: Verb::Get,
            url,
            params: Vec::new(),
            encoding: PayloadEncoding::Json,
        }
    }

    /// Interprets a membership-lookup response.
    ///
    /// Returns `None` when the response shape is unexpected; the caller
    /// treats that as a backend error rather than guessing.
    pub fn is_subscribed(&self, status: u16, body: &str) -> Option<bool> {
        match self.flavor {
            // Mailman answers with the member resource or 404.
            ProviderFlavor::Mailman => match status {
                200..=299 => Some(true),
                404 => Some(false),
                _ => None,
            },
            // Listmonk answers 200 with a (possibly empty) result set.
            ProviderFlavor::Listmonk => match status {
                200..=299 => {
                    let value: serde_json::Value = serde_json::from_str(body).ok()?;
                    let results = value.get("data")?.get("results")?.as_array()?;
                    Some(!results.is_empty())
                }
                404 => Some(false),
                _ => None,
            },
        }
    }

    /// Decodes a list-enumeration response body.
    pub fn parse_lists(&self, body: &str) -> Result<Vec<FetchedList>, serde_json::Error> {
        #[derive(Deserialize)]
        struct MailmanEntry {
            fqdn_listname: String,
            #[serde(default)]
            display_name: String,
            #[serde(default)]
            description: String,
        }
        #[derive(Deserialize)]
        struct MailmanPage {
            #[serde(default)]
            entries: Vec<MailmanEntry>,
        }
        #[derive(Deserialize)]
        struct ListmonkPage {
            data: ListmonkResults,
        }
        #[derive(Deserialize)]
        struct ListmonkResults {
            #[serde(default)]
            results: Vec<FetchedList>,
        }

        match self.flavor {
            ProviderFlavor::Mailman => {
                let page: MailmanPage = serde_json::from_str(body)?;
                Ok(page
                    .entries
                    .into_iter()
                    .map(|entry| FetchedList {
                        address: entry.fqdn_listname,
                        name: entry.display_name,
                        description: entry.description,
                        locale: default_locale(),
                    })
                    .collect())
            }
            ProviderFlavor::Listmonk => {
                let page: ListmonkPage = serde_json::from_str(body)?;
                Ok(page.data.results)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(flavor: ProviderFlavor) -> BackendDescriptor {
        BackendDescriptor {
            name: BackendName::new("main"),
            flavor,
            base_url: "https://lists.example.org/api".to_string(),
            api_key: "secret".to_string(),
        }
    }

    fn list() -> ListAddress {
        ListAddress::new("users@example.org")
    }

    // ─── Request construction ───

    #[test]
    fn mailman_subscribe_is_form_post_with_preconfirm() {
        let parts = descriptor(ProviderFlavor::Mailman).subscribe_request(
            &list(),
            "a@example.org",
            Some("Ada"),
        );
        assert_eq!(parts.verb, Verb::Post);
        assert_eq!(parts.encoding, PayloadEncoding::Form);
        assert_eq!(parts.url, "https://lists.example.org/api/members");
        assert!(parts.params.contains(&("subscriber", "a@example.org".to_string())));
        assert!(parts.params.contains(&("pre_confirmed", "true".to_string())));
        assert!(parts.params.contains(&("display_name", "Ada".to_string())));
    }

    #[test]
    fn mailman_subscribe_without_name_omits_display_name() {
        let parts =
            descriptor(ProviderFlavor::Mailman).subscribe_request(&list(), "a@example.org", None);
        assert!(!parts.params.iter().any(|(k, _)| *k == "display_name"));
    }

    #[test]
    fn listmonk_subscribe_is_json_post() {
        let desc = BackendDescriptor {
            base_url: "https://news.example.org".to_string(),
            ..descriptor(ProviderFlavor::Listmonk)
        };
        let parts = desc.subscribe_request(&list(), "a@example.org", None);
        assert_eq!(parts.verb, Verb::Post);
        assert_eq!(parts.encoding, PayloadEncoding::Json);
        assert_eq!(parts.url, "https://news.example.org/api/subscribers");
    }

    #[test]
    fn unsubscribe_uses_delete_on_both_flavors() {
        for flavor in [ProviderFlavor::Mailman, ProviderFlavor::Listmonk] {
            let parts = descriptor(flavor).unsubscribe_request(&list(), "a@example.org");
            assert_eq!(parts.verb, Verb::Delete, "{flavor:?}");
            assert!(parts.params.is_empty());
        }
    }

    #[test]
    fn auth_scheme_per_flavor() {
        assert_eq!(descriptor(ProviderFlavor::Mailman).auth(), AuthScheme::Basic);
        assert_eq!(
            descriptor(ProviderFlavor::Listmonk).auth(),
            AuthScheme::TokenHeader
        );
    }

    // ─── Check-response interpretation ───

    #[test]
    fn mailman_check_interprets_status_only() {
        let desc = descriptor(ProviderFlavor::Mailman);
        assert_eq!(desc.is_subscribed(200, ""), Some(true));
        assert_eq!(desc.is_subscribed(404, ""), Some(false));
        assert_eq!(desc.is_subscribed(500, ""), None);
    }

    #[test]
    fn listmonk_check_inspects_result_set() {
        let desc = descriptor(ProviderFlavor::Listmonk);
        assert_eq!(
            desc.is_subscribed(200, r#"{"data":{"results":[{"address":"a@b.c"}]}}"#),
            Some(true)
        );
        assert_eq!(desc.is_subscribed(200, r#"{"data":{"results":[]}}"#), Some(false));
        assert_eq!(desc.is_subscribed(200, "not json"), None);
        assert_eq!(desc.is_subscribed(404, ""), Some(false));
    }

    // ─── List enumeration parsing ───

    #[test]
    fn parse_mailman_lists() {
        let body = r#"{"entries":[
            {"fqdn_listname":"users@example.org","display_name":"Users","description":"General"},
            {"fqdn_listname":"dev@example.org"}
        ]}"#;
        let lists = descriptor(ProviderFlavor::Mailman).parse_lists(body).unwrap();
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0].address, "users@example.org");
        assert_eq!(lists[0].name, "Users");
        assert_eq!(lists[1].name, "");
        assert_eq!(lists[1].locale, "en");
    }

    #[test]
    fn parse_listmonk_lists() {
        let body = r#"{"data":{"results":[
            {"address":"news@example.org","name":"News","description":"","locale":"de"}
        ]}}"#;
        let lists = descriptor(ProviderFlavor::Listmonk).parse_lists(body).unwrap();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].locale, "de");
    }

    #[test]
    fn parse_lists_rejects_garbage() {
        assert!(descriptor(ProviderFlavor::Mailman).parse_lists("[]").is_err());
    }
}
