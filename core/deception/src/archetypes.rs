// Path and File Name : /home/sensor/home-sensor-core/core/deception/src/archetypes.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Decoy archetype route tables and credential strategies, frozen at decoy-start time

use serde::{Deserialize, Serialize};

use crate::credentials::{generate_bearer_token, generate_env_file, generate_ssh_private_key, generate_user_pass, GeneratedCredential};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecoyArchetype {
    DevServer,
    FileShare,
    HomeAssistant,
    Mimic,
}

impl DecoyArchetype {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecoyArchetype::DevServer => "dev_server",
            DecoyArchetype::FileShare => "file_share",
            DecoyArchetype::HomeAssistant => "home_assistant",
            DecoyArchetype::Mimic => "mimic",
        }
    }

    /// Maps observed service ports to the decoy archetype that would most
    /// plausibly be listening there.
    pub fn for_observed_port(port: u16) -> DecoyArchetype {
        match port {
            3000 | 3001 | 5173 | 8000 | 8080 => DecoyArchetype::DevServer,
            8123 | 1883 => DecoyArchetype::HomeAssistant,
            _ => DecoyArchetype::FileShare,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub path: String,
    pub method: String,
    pub response: RouteResponse,
}

/// A decoy's route table and planted credentials, assembled once at start
/// time and never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoyBlueprint {
    pub archetype: DecoyArchetype,
    pub routes: Vec<Route>,
    pub planted_credentials: Vec<GeneratedCredential>,
}

const REACT_ERROR_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Application Error</title></head>
<body>
<div id="__next">
  <div style="font-family: -apple-system, BlinkMacSystemFont, sans-serif; padding: 20px;">
    <h2>Application error: a client-side exception has occurred</h2>
    <p style="color: #666;">See the developer console for more information.</p>
    <p style="font-size: 12px; color: #999;">React and Next.js development server v14.1.0</p>
  </div>
</div>
</body>
</html>"#;

fn dev_server_blueprint() -> DecoyBlueprint {
    let (env_cred, aws_cred) = generate_env_file();
    let health = r#"{"status":"ok","uptime":847293,"version":"1.4.2","environment":"development"}"#;

    DecoyBlueprint {
        archetype: DecoyArchetype::DevServer,
        routes: vec![
            Route {
                path: "/".into(),
                method: "GET".into(),
                response: RouteResponse {
                    status: 500,
                    headers: vec![
                        ("Content-Type".into(), "text/html; charset=utf-8".into()),
                        ("X-Powered-By".into(), "Next.js".into()),
                    ],
                    body: REACT_ERROR_PAGE.into(),
                },
            },
            Route {
                path: "/api/health".into(),
                method: "GET".into(),
                response: RouteResponse {
                    status: 200,
                    headers: vec![
                        ("Content-Type".into(), "application/json".into()),
                        ("X-Powered-By".into(), "Express".into()),
                    ],
                    body: health.into(),
                },
            },
            Route {
                path: "/.env".into(),
                method: "GET".into(),
                response: RouteResponse {
                    status: 200,
                    headers: vec![("Content-Type".into(), "text/plain; charset=utf-8".into())],
                    body: env_cred.credential_value.clone(),
                },
            },
        ],
        planted_credentials: vec![env_cred, aws_cred],
    }
}

fn directory_listing_html(password_filename: &str) -> String {
    let pad = " ".repeat((55usize).saturating_sub(password_filename.len()).max(1));
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>Index of /</title></head>\n<body>\n<h1>Index of /</h1>\n<hr>\n<pre>\n\
         <a href=\"{password_filename}\">{password_filename}</a>{pad}14-Jan-2024 03:22    1.2K\n\
         <a href=\".ssh/\">.ssh/</a>                                                      08-Dec-2023 19:45       -\n\
         </pre>\n<hr>\n</body>\n</html>"
    )
}

fn file_share_blueprint() -> DecoyBlueprint {
    let user_pass = generate_user_pass("admin");
    let ssh_key = generate_ssh_private_key();
    let password_filename = "passwords.txt";

    DecoyBlueprint {
        archetype: DecoyArchetype::FileShare,
        routes: vec![
            Route {
                path: "/".into(),
                method: "GET".into(),
                response: RouteResponse {
                    status: 200,
                    headers: vec![
                        ("Content-Type".into(), "text/html".into()),
                        ("Server".into(), "nginx/1.24.0".into()),
                    ],
                    body: directory_listing_html(password_filename),
                },
            },
            Route {
                path: format!("/{password_filename}"),
                method: "GET".into(),
                response: RouteResponse {
                    status: 200,
                    headers: vec![("Content-Type".into(), "text/plain".into())],
                    body: user_pass.credential_value.clone(),
                },
            },
            Route {
                path: "/.ssh/id_rsa".into(),
                method: "GET".into(),
                response: RouteResponse {
                    status: 200,
                    headers: vec![("Content-Type".into(), "text/plain".into())],
                    body: ssh_key.credential_value.clone(),
                },
            },
        ],
        planted_credentials: vec![user_pass, ssh_key],
    }
}

fn home_assistant_blueprint() -> DecoyBlueprint {
    let bearer = generate_bearer_token();
    let discovery = r#"{"version":"2024.1.2","installation_type":"Home Assistant OS","location_name":"Home"}"#;

    DecoyBlueprint {
        archetype: DecoyArchetype::HomeAssistant,
        routes: vec![
            Route {
                path: "/api/".into(),
                method: "GET".into(),
                response: RouteResponse {
                    status: 200,
                    headers: vec![("Content-Type".into(), "application/json".into())],
                    body: r#"{"message":"API running."}"#.into(),
                },
            },
            Route {
                path: "/api/discovery_info".into(),
                method: "GET".into(),
                response: RouteResponse {
                    status: 200,
                    headers: vec![("Content-Type".into(), "application/json".into())],
                    body: discovery.into(),
                },
            },
        ],
        planted_credentials: vec![bearer],
    }
}

/// Builds a fresh blueprint for an archetype, generating new synthetic
/// credentials each time so repeated deployments never reuse a secret.
pub fn build_blueprint(archetype: DecoyArchetype) -> DecoyBlueprint {
    match archetype {
        DecoyArchetype::DevServer => dev_server_blueprint(),
        DecoyArchetype::FileShare => file_share_blueprint(),
        DecoyArchetype::HomeAssistant => home_assistant_blueprint(),
        DecoyArchetype::Mimic => file_share_blueprint(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_server_serves_env_file_with_matching_credential() {
        let blueprint = build_blueprint(DecoyArchetype::DevServer);
        let env_route = blueprint.routes.iter().find(|r| r.path == "/.env").unwrap();
        assert!(blueprint.planted_credentials.iter().any(|c| c.credential_value == env_route.response.body));
    }

    #[test]
    fn file_share_serves_distinct_credentials_per_route() {
        let blueprint = build_blueprint(DecoyArchetype::FileShare);
        assert_eq!(blueprint.planted_credentials.len(), 2);
    }

    #[test]
    fn port_mapping_picks_dev_server_for_developer_ports() {
        assert_eq!(DecoyArchetype::for_observed_port(3000), DecoyArchetype::DevServer);
        assert_eq!(DecoyArchetype::for_observed_port(8123), DecoyArchetype::HomeAssistant);
        assert_eq!(DecoyArchetype::for_observed_port(445), DecoyArchetype::FileShare);
    }
}
