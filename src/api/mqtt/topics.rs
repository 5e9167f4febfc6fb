use crate::prelude::*;

/// Topics of the publishing host, following the Tasmota `tele/<host>/…` layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topics {
    /// Retained `Online` / `Offline` presence, also the last will topic.
    pub presence: String,

    /// Price snapshots.
    pub data: String,
}

impl Topics {
    pub fn new(hostname: &str) -> Self {
        Self { presence: format!("tele/{hostname}/LWT"), data: format!("tele/{hostname}/PRICES") }
    }

    /// Derive the topics from the local network name, unless overridden.
    pub fn try_resolve(hostname: Option<&str>) -> Result<Self> {
        let hostname = hostname.map_or_else(local_hostname, |hostname| Ok(hostname.to_owned()))?;
        Ok(Self::new(&hostname))
    }
}

fn local_hostname() -> Result<String> {
    hostname::get()
        .context("failed to get the host name")?
        .into_string()
        .map_err(|hostname| anyhow::anyhow!("the host name `{hostname:?}` is not valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ok() {
        let topics = Topics::new("pi4");
        assert_eq!(topics.presence, "tele/pi4/LWT");
        assert_eq!(topics.data, "tele/pi4/PRICES");
    }

    #[test]
    fn override_ok() -> Result {
        assert_eq!(Topics::try_resolve(Some("nas"))?, Topics::new("nas"));
        Ok(())
    }

    #[test]
    fn local_hostname_ok() -> Result {
        let topics = Topics::try_resolve(None)?;
        assert!(topics.presence.starts_with("tele/"));
        assert!(topics.presence.ends_with("/LWT"));
        assert!(topics.data.ends_with("/PRICES"));
        Ok(())
    }
}
