use std::fmt;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::{ApiError, Result};

/// Environment variable read by [`HostList::from_env`].
pub const HOSTS_ENV_VAR: &str = "ESTATE_API_HOSTS";

/// Ordered, non-empty list of base URLs with a shared "current" pointer.
///
/// Clones share the pointer, so every clone of an
/// [`ApiClient`](crate::ApiClient) sees the same current host. Separate
/// `HostList` values never interfere with each other.
///
/// Concurrent calls that both fall back may race on [`HostList::select`];
/// the last writer wins.
#[derive(Clone)]
pub struct HostList {
    inner: Arc<Inner>,
}

struct Inner {
    hosts: Vec<String>,
    current: AtomicUsize,
}

impl HostList {
    /// Builds a host list. The first entry becomes current.
    ///
    /// Trailing slashes are stripped. Fails if no non-blank host is given.
    pub fn new<I, S>(hosts: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hosts: Vec<String> = hosts
            .into_iter()
            .map(|host| host.as_ref().trim().trim_end_matches('/').to_owned())
            .filter(|host| !host.is_empty())
            .collect();

        if hosts.is_empty() {
            return Err(ApiError::Config("host list must not be empty".to_owned()));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                hosts,
                current: AtomicUsize::new(0),
            }),
        })
    }

    /// Reads a comma-separated host list from `ESTATE_API_HOSTS`.
    ///
    /// **Not available on `wasm32` targets.**
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Result<Self> {
        let raw = std::env::var(HOSTS_ENV_VAR).map_err(|_| {
            ApiError::Config(format!("missing {HOSTS_ENV_VAR} environment variable"))
        })?;
        Self::new(raw.split(','))
            .map_err(|_| ApiError::Config(format!("{HOSTS_ENV_VAR} is set but empty")))
    }

    /// Number of configured hosts (always at least one).
    pub fn len(&self) -> usize {
        self.inner.hosts.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn as_slice(&self) -> &[String] {
        &self.inner.hosts
    }

    pub fn current_index(&self) -> usize {
        self.inner.current.load(Ordering::Acquire)
    }

    /// Base URL of the current host.
    pub fn current(&self) -> &str {
        &self.inner.hosts[self.current_index()]
    }

    /// Makes `index` the current host. Returns `false` if it is out of range.
    pub fn select(&self, index: usize) -> bool {
        if index >= self.len() {
            return false;
        }
        self.inner.current.store(index, Ordering::Release);
        true
    }

    /// Moves to the next host, wrapping around, and returns it.
    pub fn advance(&self) -> &str {
        let next = (self.current_index() + 1) % self.len();
        self.inner.current.store(next, Ordering::Release);
        &self.inner.hosts[next]
    }

    /// Indices of every host except `tried`, in list order.
    pub(crate) fn fallback_order(&self, tried: usize) -> impl Iterator<Item = usize> {
        (0..self.len()).filter(move |&index| index != tried)
    }

    pub(crate) fn host(&self, index: usize) -> &str {
        &self.inner.hosts[index]
    }
}

impl fmt::Debug for HostList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostList")
            .field("hosts", &self.inner.hosts)
            .field("current", &self.current_index())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::HostList;
    use crate::ApiError;

    #[test]
    fn rejects_empty_list() {
        let err = HostList::new(Vec::<String>::new()).expect_err("empty list must fail");
        assert!(matches!(err, ApiError::Config(_)));

        let err = HostList::new([" ", ""]).expect_err("blank hosts must fail");
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn first_host_is_current_and_slash_is_trimmed() {
        let hosts = HostList::new(["http://a/api/", "http://b/api"]).expect("valid hosts");
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts.current(), "http://a/api");
    }

    #[test]
    fn advance_wraps_around() {
        let hosts = HostList::new(["a", "b", "c"]).expect("valid hosts");
        assert_eq!(hosts.advance(), "b");
        assert_eq!(hosts.advance(), "c");
        assert_eq!(hosts.advance(), "a");
    }

    #[test]
    fn select_keeps_index_in_bounds() {
        let hosts = HostList::new(["a", "b"]).expect("valid hosts");
        assert!(hosts.select(1));
        assert_eq!(hosts.current(), "b");
        assert!(!hosts.select(2));
        assert_eq!(hosts.current_index(), 1);
    }

    #[test]
    fn clones_share_current_but_separate_lists_do_not() {
        let first = HostList::new(["a", "b"]).expect("valid hosts");
        let shared = first.clone();
        let other = HostList::new(["a", "b"]).expect("valid hosts");

        first.advance();
        assert_eq!(shared.current(), "b");
        assert_eq!(other.current(), "a");
    }

    #[test]
    fn fallback_order_skips_tried_host() {
        let hosts = HostList::new(["a", "b", "c"]).expect("valid hosts");
        let order: Vec<usize> = hosts.fallback_order(1).collect();
        assert_eq!(order, vec![0, 2]);
    }
}
