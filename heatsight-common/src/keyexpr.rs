/// Default key expression prefix for heat-pump bridges.
pub const KEY_PREFIX: &str = "heatsight/heatpump";

/// Suffix appended to a point key to address write commands.
pub const COMMAND_SUFFIX: &str = "set";

/// Builder for HeatSight key expressions.
///
/// Layout under the prefix:
///
/// ```text
/// <prefix>/<device>/<point>            readings
/// <prefix>/<device>/<point>/set        write commands
/// <prefix>/<device>/@/points/<point>   point descriptors
/// <prefix>/@/status                    bridge status
/// ```
#[derive(Debug, Clone)]
pub struct KeyExprBuilder {
    prefix: String,
}

impl Default for KeyExprBuilder {
    fn default() -> Self {
        Self::new(KEY_PREFIX)
    }
}

impl KeyExprBuilder {
    /// Create a builder rooted at `prefix` (trailing slashes are ignored).
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    /// The configured prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Key for readings of a point.
    ///
    /// ```
    /// use heatsight_common::keyexpr::KeyExprBuilder;
    ///
    /// let keys = KeyExprBuilder::default();
    /// assert_eq!(keys.reading("eq2021", "TEMP_COIL"), "heatsight/heatpump/eq2021/TEMP_COIL");
    /// ```
    pub fn reading(&self, device: &str, point: &str) -> String {
        format!("{}/{}/{}", self.prefix, device, point)
    }

    /// Key on which write commands for a point are received.
    pub fn command(&self, device: &str, point: &str) -> String {
        format!("{}/{}/{}/{}", self.prefix, device, point, COMMAND_SUFFIX)
    }

    /// Wildcard matching write commands for every point of a device.
    pub fn command_wildcard(&self, device: &str) -> String {
        format!("{}/{}/*/{}", self.prefix, device, COMMAND_SUFFIX)
    }

    /// Key for the descriptor of a point.
    pub fn descriptor(&self, device: &str, point: &str) -> String {
        format!("{}/{}/@/points/{}", self.prefix, device, point)
    }

    /// Key for bridge status.
    pub fn status(&self) -> String {
        format!("{}/@/status", self.prefix)
    }

    /// Extract `(device, point)` from a command key under this prefix.
    ///
    /// Returns `None` for anything that is not `<prefix>/<device>/<point>/set`.
    pub fn parse_command<'a>(&self, key: &'a str) -> Option<CommandKey<'a>> {
        let rest = key.strip_prefix(self.prefix.as_str())?.strip_prefix('/')?;
        let mut parts = rest.split('/');

        let device = parts.next().filter(|s| !s.is_empty())?;
        let point = parts.next().filter(|s| !s.is_empty() && *s != "@")?;
        if parts.next() != Some(COMMAND_SUFFIX) || parts.next().is_some() {
            return None;
        }

        Some(CommandKey { device, point })
    }
}

/// Components of a command key expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandKey<'a> {
    pub device: &'a str,
    pub point: &'a str,
}
