//! Declarative anti-fingerprinting settings.
//!
//! Everything a session spoofs is described by one `StealthProfile` and
//! applied once when the session is created: launch flags, request headers,
//! and a script installed before any page script runs.

use serde_json::json;
use shared::config::BrowserConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct StealthProfile {
    pub user_agent: String,
    pub accept_language: String,
    pub platform: String,
    pub languages: Vec<String>,
    pub plugin_count: u32,
    pub webgl_vendor: String,
    pub webgl_renderer: String,
    pub hide_webdriver: bool,
}

impl Default for StealthProfile {
    fn default() -> Self {
        Self::from_config(&BrowserConfig::default())
    }
}

impl StealthProfile {
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            accept_language: config.accept_language.clone(),
            platform: config.platform.clone(),
            languages: config.languages.clone(),
            plugin_count: config.plugin_count,
            webgl_vendor: config.webgl_vendor.clone(),
            webgl_renderer: config.webgl_renderer.clone(),
            hide_webdriver: true,
        }
    }

    /// Browser flags that keep automation markers out of the page.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = vec![format!("--user-agent={}", self.user_agent)];
        if let Some(lang) = self.languages.first() {
            args.push(format!("--lang={}", lang));
        }
        if self.hide_webdriver {
            args.push("--disable-blink-features=AutomationControlled".to_string());
        }
        args
    }

    /// Headers sent with every request.
    pub fn extra_headers(&self) -> serde_json::Value {
        json!({
            "Accept-Language": self.accept_language,
            "Sec-CH-UA-Platform": format!("\"{}\"", self.platform),
        })
    }

    /// Script evaluated in every new document before the site's own scripts.
    pub fn init_script(&self) -> String {
        let languages = json!(self.languages).to_string();
        let vendor = json!(self.webgl_vendor).to_string();
        let renderer = json!(self.webgl_renderer).to_string();
        let plugins = self.plugin_count;

        let mut script = String::from("(() => {\n");
        if self.hide_webdriver {
            script.push_str(
                "  Object.defineProperty(navigator, 'webdriver', { get: () => undefined, configurable: true });\n",
            );
        }
        script.push_str(&format!(
            "  Object.defineProperty(navigator, 'languages', {{ get: () => {languages}, configurable: true }});\n"
        ));
        script.push_str(&format!(
            "  Object.defineProperty(navigator, 'plugins', {{ get: () => Array.from({{ length: {plugins} }}, (_, i) => ({{ name: 'Plugin ' + i }})), configurable: true }});\n"
        ));
        script.push_str(&format!(
            r#"  const patch = (proto) => {{
    if (!proto) return;
    const original = proto.getParameter;
    proto.getParameter = function (p) {{
      if (p === 37445) return {vendor};
      if (p === 37446) return {renderer};
      return original.call(this, p);
    }};
  }};
  patch(window.WebGLRenderingContext && WebGLRenderingContext.prototype);
  patch(window.WebGL2RenderingContext && WebGL2RenderingContext.prototype);
"#
        ));
        script.push_str("  if (!window.chrome) { window.chrome = { runtime: {} }; }\n");
        script.push_str("})();\n");
        script
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_args() {
        let profile = StealthProfile::default();
        let args = profile.launch_args();
        assert!(args.contains(&"--disable-blink-features=AutomationControlled".to_string()));
        assert!(args.contains(&"--lang=ja".to_string()));
        assert!(args[0].starts_with("--user-agent=Mozilla/5.0"));
    }

    #[test]
    fn test_extra_headers() {
        let headers = StealthProfile::default().extra_headers();
        assert_eq!(headers["Accept-Language"], "ja,en;q=0.9");
        assert_eq!(headers["Sec-CH-UA-Platform"], "\"Windows\"");
    }

    #[test]
    fn test_init_script_reflects_profile() {
        let profile = StealthProfile {
            languages: vec!["en-US".to_string(), "en".to_string()],
            plugin_count: 5,
            webgl_vendor: "Vendor \"X\"".to_string(),
            ..StealthProfile::default()
        };
        let script = profile.init_script();
        assert!(script.contains("'webdriver'"));
        assert!(script.contains(r#"["en-US","en"]"#));
        assert!(script.contains("length: 5"));
        // Values are embedded as JSON string literals
        assert!(script.contains(r#""Vendor \"X\"""#));
    }

    #[test]
    fn test_webdriver_override_optional() {
        let profile = StealthProfile {
            hide_webdriver: false,
            ..StealthProfile::default()
        };
        assert!(!profile.init_script().contains("'webdriver'"));
        assert!(!profile
            .launch_args()
            .iter()
            .any(|a| a.contains("AutomationControlled")));
    }
}
