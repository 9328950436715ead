//! The reservation protocol
//!
//! Chooses at most one worker per URL to refetch the origin. Every worker
//! that cannot serve from cache bumps the metadata's `reservation` counter
//! (or inserts a fresh reservation placeholder); the worker whose write
//! lands exactly one past `last_noted` has won and fetches immediately.
//! Losers back off for a randomized window scaled by the observed number
//! of contenders, polling the metadata so they can stop waiting as soon as
//! any worker publishes a valid entry or the reservation disappears.

use std::time::Duration;
use tracing::debug;
use webcache_types::{Clock, Entropy, Error, KvStore, Result};

use crate::config::EngineConfig;
use crate::record::{MetadataEntry, ReservationToken};

/// Bump the reservation counter, inserting a placeholder when no metadata
/// exists
///
/// Returns the stored entry and whether this worker won. A brand-new
/// reservation wins immediately (`1 == 0 + 1`). Exhausting the attempt
/// budget is the categorical consistency failure.
pub async fn update_reservation(
    kv: &dyn KvStore,
    clock: &dyn Clock,
    config: &EngineConfig,
    url: &str,
) -> Result<(MetadataEntry, bool)> {
    for attempt in 0..config.update_max_attempts {
        let entry = match MetadataEntry::load(kv, url).await? {
            Some(mut entry) => {
                entry.record.reservation += 1;
                entry
            }
            None => MetadataEntry::new_reservation(url, clock.now_utc()),
        };

        if entry.store(kv).await? {
            let won = entry.record.reservation == entry.record.last_noted + 1;
            return Ok((entry, won));
        }
        debug!(url, attempt, "reservation write lost, retrying");
    }

    Err(Error::consistency(format!(
        "could not reserve {url} within {} attempts",
        config.update_max_attempts
    )))
}

/// Compete for the right to refetch the origin for `url`
///
/// The winner returns immediately with its reservation token. A loser
/// sleeps for a uniform random number of seconds in
/// `[0, min(contenders * backoff_multiply, backoff_max)]`, waking every
/// poll interval to re-check the metadata, and returns early once the
/// entry is valid or gone.
pub async fn compete_for_cache_update(
    kv: &dyn KvStore,
    clock: &dyn Clock,
    entropy: &dyn Entropy,
    config: &EngineConfig,
    url: &str,
) -> Result<(bool, ReservationToken)> {
    let (entry, won) = update_reservation(kv, clock, config, url).await?;
    let token = entry.reservation_token();

    if won {
        debug!(url, reservation = token.reservation, "won cache update");
        return Ok((true, token));
    }

    let window = config.backoff_window_secs(entry.record.reservation, entry.record.last_noted);
    let backoff_secs = entropy.random_range(0, window + 1);
    let deadline = clock.now_utc() + chrono::Duration::seconds(backoff_secs as i64);
    debug!(
        url,
        reservation = token.reservation,
        backoff_secs,
        "lost cache update, backing off"
    );

    while deadline > clock.now_utc() {
        let remaining = (deadline - clock.now_utc())
            .to_std()
            .unwrap_or(Duration::ZERO);
        clock.sleep(config.poll_interval.min(remaining)).await;

        match MetadataEntry::load(kv, url).await? {
            // the blocking worker gave up or the entry was evicted
            None => break,
            // someone published; the caller's re-check will pick it up
            Some(entry) if entry.record.valid => break,
            Some(_) => {}
        }
    }
    debug!(url, "finished cache backoff");

    Ok((false, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use webcache_types::{DeterministicEntropy, FakeClock, MemoryKv};

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    #[tokio::test]
    async fn test_first_reservation_wins() {
        let kv = MemoryKv::new();
        let clock = FakeClock::at_epoch();

        let (entry, won) = update_reservation(&kv, &clock, &config(), "/u")
            .await
            .unwrap();
        assert!(won);
        assert_eq!(entry.record.reservation, 1);
        assert_eq!(entry.record.last_noted, 0);
        assert!(!entry.record.valid);

        // the placeholder landed in the store
        let stored = MetadataEntry::load(&kv, "/u").await.unwrap().unwrap();
        assert_eq!(stored.record, entry.record);
    }

    #[tokio::test]
    async fn test_second_contender_loses() {
        let kv = MemoryKv::new();
        let clock = FakeClock::at_epoch();

        let (first, _) = update_reservation(&kv, &clock, &config(), "/u")
            .await
            .unwrap();
        let (second, won) = update_reservation(&kv, &clock, &config(), "/u")
            .await
            .unwrap();

        assert!(!won);
        assert_eq!(second.record.reservation, 2);
        // same lifetime, same session
        assert_eq!(second.record.session, first.record.session);
        assert!(second.record.last_noted <= second.record.reservation);
    }

    #[tokio::test]
    async fn test_winner_after_publication_is_next_in_line() {
        let kv = MemoryKv::new();
        let clock = FakeClock::at_epoch();

        let (_, _) = update_reservation(&kv, &clock, &config(), "/u")
            .await
            .unwrap();

        // simulate a successful publication: last_noted catches up
        let mut published = MetadataEntry::load(&kv, "/u").await.unwrap().unwrap();
        published.record.last_noted = published.record.reservation;
        published.record.valid = true;
        assert!(published.store(&kv).await.unwrap());

        let (entry, won) = update_reservation(&kv, &clock, &config(), "/u")
            .await
            .unwrap();
        assert!(won);
        assert_eq!(entry.record.reservation, 2);
        assert_eq!(entry.record.last_noted, 1);
    }

    #[tokio::test]
    async fn test_loser_backs_off_and_polls_until_deadline() {
        let kv = MemoryKv::new();
        let clock = FakeClock::at_epoch();
        let entropy = DeterministicEntropy::new(1);

        // seed a reservation owned by a peer
        let (_, _) = update_reservation(&kv, &clock, &config(), "/u")
            .await
            .unwrap();

        let (won, token) = compete_for_cache_update(&kv, &clock, &entropy, &config(), "/u")
            .await
            .unwrap();
        assert!(!won);
        assert_eq!(token.reservation, 2);
        // the fake clock advanced through the whole backoff window
        assert!(clock.timestamp() <= config().backoff_max_secs as i64 + 1);
    }

    #[tokio::test]
    async fn test_loser_stops_polling_once_entry_is_valid() {
        let kv = MemoryKv::new();
        let clock = FakeClock::at_epoch();
        let entropy = DeterministicEntropy::new(1);

        let (_, _) = update_reservation(&kv, &clock, &config(), "/u")
            .await
            .unwrap();
        // publication arrives before the loser starts waiting
        let mut published = MetadataEntry::load(&kv, "/u").await.unwrap().unwrap();
        published.record.valid = true;
        published.record.fetched = Some(0);
        assert!(published.store(&kv).await.unwrap());

        let (won, _) = compete_for_cache_update(&kv, &clock, &entropy, &config(), "/u")
            .await
            .unwrap();
        assert!(!won);
        // at most one poll tick elapsed
        assert!(clock.now_utc().timestamp_millis() <= 500);
    }
}
