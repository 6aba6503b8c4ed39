//! Host name resolution raced against a timeout.
//!
//! The lookup itself is delegated to the runtime's resolver; this module only
//! wires it into a [`Race`] with the configured [`Timer`] and
//! [`AbortTrigger`].
//!
//! [`Race`]: crate::future::Race
//! [`Timer`]: crate::future::Timer
//! [`AbortTrigger`]: crate::future::AbortTrigger

use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};

use crate::error::{OperationError, TimerOutcome};
use crate::future::RaceResult;
use crate::report::Records;

/// One address a host name resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// The host name that was resolved.
    pub host: String,
    /// The service, as the port number it was resolved for.
    pub service: u16,
    /// The resolved address.
    pub addr: IpAddr,
}

impl Endpoint {
    /// The address and port as a socket address.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.service)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.service, self.addr, self.host)
    }
}

/// Every endpoint a resolution produced, in resolver order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    endpoints: Vec<Endpoint>,
}

impl Resolved {
    /// Collect resolved socket addresses for `host`.
    pub fn new(host: &str, addrs: impl IntoIterator<Item = SocketAddr>) -> Self {
        let endpoints = addrs
            .into_iter()
            .map(|addr| Endpoint {
                host: host.to_owned(),
                service: addr.port(),
                addr: addr.ip(),
            })
            .collect();
        Self { endpoints }
    }

    /// The resolved endpoints.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Returns `true` if nothing was resolved.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl Records for Resolved {
    fn records(&self) -> Vec<String> {
        self.endpoints.iter().map(ToString::to_string).collect()
    }
}

/// The outcome of a resolution race.
pub type ResolveResult =
    RaceResult<Result<Resolved, OperationError<io::Error>>, TimerOutcome>;

#[cfg(feature = "tokio")]
pub use self::tokio_impl::resolve;

#[cfg(feature = "tokio")]
mod tokio_impl {
    use std::io;

    use super::{ResolveResult, Resolved};
    use crate::clock::TokioClock;
    use crate::config::ResolveConfig;
    use crate::future::{race, AbortTrigger, Operation, Timer};

    /// Resolve `config.host` on `config.port`, bounded by the configured
    /// timeout and abort trigger.
    ///
    /// The lookup, the timer and the trigger are all armed when this future
    /// is first polled and are torn down before it returns. A lookup that
    /// loses keeps running on Tokio's blocking pool until the system
    /// resolver returns, but its result is discarded.
    ///
    /// # Examples
    ///
    /// ```
    /// use race_cancel::config::ResolveConfig;
    /// use race_cancel::resolve::resolve;
    /// use race_cancel::TokioClock;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let config = ResolveConfig::new("127.0.0.1", 443);
    /// let result = resolve(&TokioClock::new(), &config).await;
    ///
    /// let resolved = result.into_result().unwrap();
    /// assert_eq!(resolved.endpoints()[0].to_string(), "443, 127.0.0.1, 127.0.0.1");
    /// # }
    /// ```
    pub async fn resolve(clock: &TokioClock, config: &ResolveConfig) -> ResolveResult {
        let host = config.host.clone();
        let port = config.port;
        tracing::debug!(
            %host,
            port,
            timeout_ms = config.race.timeout_ms,
            abort_after_ms = ?config.race.abort_after_ms,
            "starting resolution race"
        );

        let lookup = Operation::start(async move {
            let addrs = tokio::net::lookup_host((host.as_str(), port)).await?;
            Ok::<_, io::Error>(Resolved::new(&host, addrs))
        });
        let timer = Timer::after(clock, config.race.timeout());
        let trigger = AbortTrigger::configured(clock, config.race.abort_after());

        let result = race(lookup, timer).abort_on(trigger).await;
        tracing::debug!(status = %result.status(), "resolution race finished");
        result
    }
}
