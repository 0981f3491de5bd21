//! Well-known redirect targets.

use serde::{Deserialize, Serialize};

pub const LOGIN_PATH: &str = "/login";
pub const CHANGE_PASSWORD_PATH: &str = "/change-password";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const FORBIDDEN_PATH: &str = "/forbidden";

/// Query parameter carrying the originally requested path through login.
pub const CALLBACK_PARAM: &str = "callbackUrl";

/// The four paths policy evaluation may redirect to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectTargets {
    pub login: String,
    pub change_password: String,
    pub dashboard: String,
    pub forbidden: String,
}

impl Default for RedirectTargets {
    fn default() -> Self {
        Self {
            login: LOGIN_PATH.to_string(),
            change_password: CHANGE_PASSWORD_PATH.to_string(),
            dashboard: DASHBOARD_PATH.to_string(),
            forbidden: FORBIDDEN_PATH.to_string(),
        }
    }
}

impl RedirectTargets {
    /// Login path with the original destination preserved, e.g.
    /// `/login?callbackUrl=%2Fdashboard`.
    pub fn login_with_callback(&self, original_path: &str) -> String {
        format!(
            "{}?{}={}",
            self.login,
            CALLBACK_PARAM,
            urlencoding::encode(original_path)
        )
    }
}
