//! MX resolution for direct-to-domain delivery.
//!
//! The engine never resolves DNS itself: it goes through the [`MxResolver`]
//! collaborator, so alternative lookups (a test stub, a platform-specific
//! tool) can be plugged in without the engine knowing.

use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::Resolver;

use crate::smtp::error::{self, Error};

/// Resolves the mail exchangers for a domain.
pub trait MxResolver {
    /// Returns the MX hostnames for `domain`, best preference first.
    fn resolve_mx(&self, domain: &str) -> Result<Vec<String>, Error>;
}

/// The default resolver, backed by the system DNS configuration.
pub struct DnsMxResolver {
    resolver: Resolver,
}

impl DnsMxResolver {
    /// Creates a resolver from the system configuration, falling back to
    /// well-known public defaults when none can be read.
    pub fn new() -> Result<DnsMxResolver, Error> {
        let resolver = Resolver::from_system_conf()
            .or_else(|_| Resolver::new(ResolverConfig::default(), ResolverOpts::default()))
            .map_err(error::resolve)?;
        Ok(DnsMxResolver { resolver })
    }
}

impl MxResolver for DnsMxResolver {
    fn resolve_mx(&self, domain: &str) -> Result<Vec<String>, Error> {
        let lookup = self.resolver.mx_lookup(domain).map_err(error::resolve)?;

        let mut records: Vec<(u16, String)> = lookup
            .iter()
            .map(|mx| {
                let exchange = mx.exchange().to_utf8();
                (mx.preference(), exchange.trim_end_matches('.').to_string())
            })
            .filter(|(_, exchange)| !exchange.is_empty())
            .collect();
        records.sort_by_key(|(preference, _)| *preference);

        Ok(records.into_iter().map(|(_, exchange)| exchange).collect())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A scripted resolver for tests.
    pub struct StaticResolver(pub Vec<String>);

    impl MxResolver for StaticResolver {
        fn resolve_mx(&self, _domain: &str) -> Result<Vec<String>, Error> {
            Ok(self.0.clone())
        }
    }
}
