pub(crate) const DEFAULT_API_URL: &str = "http://localhost:6689";
pub(crate) const DEFAULT_AUTOSAVE_MS: u32 = 500;

#[derive(Clone, Debug, PartialEq)]
pub struct EnvConfig {
    pub api_url: String,

    /// Quiet period before an edit is autosaved.
    pub autosave_ms: u32,
}

impl EnvConfig {
    /// Read from `window.ENV` in the browser, defaults everywhere else.
    pub fn new() -> Self {
        #[allow(unused_mut)]
        let mut cfg = Self::defaults();

        #[cfg(target_arch = "wasm32")]
        {
            // Both `window.ENV.API_URL` and `window.ENV.api_url` are accepted.
            if let Some(url) = read_env_string(&["API_URL", "api_url"]) {
                cfg.api_url = url;
            }
            if let Some(ms) = read_env_number(&["AUTOSAVE_MS", "autosave_ms"]) {
                cfg.autosave_ms = ms;
            }
        }

        tracing::debug!(api_url = %cfg.api_url, autosave_ms = cfg.autosave_ms, "loaded config");
        cfg
    }

    pub fn defaults() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            autosave_ms: DEFAULT_AUTOSAVE_MS,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_autosave_ms(mut self, autosave_ms: u32) -> Self {
        self.autosave_ms = autosave_ms;
        self
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_arch = "wasm32")]
fn read_env_value(keys: &[&str]) -> Option<wasm_bindgen::JsValue> {
    let window = web_sys::window()?;
    let env = window.get("ENV")?;
    if env.is_undefined() || !env.is_object() {
        return None;
    }
    keys.iter().find_map(|k| {
        js_sys::Reflect::get(&env, &(*k).into())
            .ok()
            .filter(|v| !v.is_undefined() && !v.is_null())
    })
}

#[cfg(target_arch = "wasm32")]
fn read_env_string(keys: &[&str]) -> Option<String> {
    read_env_value(keys)?.as_string()
}

#[cfg(target_arch = "wasm32")]
fn read_env_number(keys: &[&str]) -> Option<u32> {
    let v = read_env_value(keys)?;
    if let Some(n) = v.as_f64() {
        return (n >= 0.0).then_some(n as u32);
    }
    v.as_string()?.trim().parse().ok()
}
