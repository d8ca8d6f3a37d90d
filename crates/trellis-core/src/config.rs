//! Router configuration

/// Router configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Compare static segments and pattern literals case-sensitively
    pub match_case: bool,
    /// Trim trailing `/` from request paths before lookup
    pub strip_trailing_slash: bool,
    /// Serve `HEAD` with the `GET` handler when no `HEAD` or `*` handler exists
    pub head_falls_back_to_get: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            match_case: !cfg!(windows),
            strip_trailing_slash: true,
            head_falls_back_to_get: true,
        }
    }
}

impl RouterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn match_case(mut self, match_case: bool) -> Self {
        self.match_case = match_case;
        self
    }

    pub fn strip_trailing_slash(mut self, strip: bool) -> Self {
        self.strip_trailing_slash = strip;
        self
    }

    pub fn head_falls_back_to_get(mut self, fallback: bool) -> Self {
        self.head_falls_back_to_get = fallback;
        self
    }
}
