//! Smart-card ("badge") presence probe.
//!
//! This is a convenience veto, not an authentication check: every failure
//! in the PC/SC stack reads as "no badge" so the workstation still locks.
use lockguard_traits::BadgeReader;

/// Reader names containing this marker are software-emulated (TPM virtual
/// smart cards) and always report a card.
pub const VIRTUAL_READER_MARKER: &str = "Virtual";

#[inline]
pub fn is_virtual_reader(name: &str) -> bool {
    name.contains(VIRTUAL_READER_MARKER)
}

/// Badge reader that never sees a card.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBadge;

impl BadgeReader for NoBadge {
    fn has_badge(&mut self) -> bool {
        false
    }
}

#[cfg(feature = "smartcard")]
pub use pcsc_reader::PcscBadgeReader;

#[cfg(feature = "smartcard")]
mod pcsc_reader {
    use lockguard_traits::BadgeReader;
    use pcsc::{Context, Protocols, Scope, ShareMode, Status};
    use tracing::{debug, trace};

    use super::is_virtual_reader;

    /// Queries the platform PC/SC service on every call.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct PcscBadgeReader;

    impl PcscBadgeReader {
        pub fn new() -> Self {
            Self
        }
    }

    impl BadgeReader for PcscBadgeReader {
        fn has_badge(&mut self) -> bool {
            let ctx = match Context::establish(Scope::User) {
                Ok(ctx) => ctx,
                Err(e) => {
                    debug!(error = %e, "pcsc context unavailable");
                    return false;
                }
            };
            let readers = match ctx.list_readers_owned() {
                Ok(r) => r,
                Err(e) => {
                    trace!(error = %e, "no smart-card readers");
                    return false;
                }
            };

            let mut present = false;
            for reader in readers {
                let name = reader.to_string_lossy();
                if is_virtual_reader(&name) {
                    trace!(reader = %name, "skipping virtual reader");
                    continue;
                }
                let card = match ctx.connect(&reader, ShareMode::Shared, Protocols::ANY) {
                    Ok(card) => card,
                    Err(e) => {
                        trace!(reader = %name, error = %e, "connect failed");
                        continue;
                    }
                };
                match card.status2_owned() {
                    Ok(status) if !status.status().contains(Status::ABSENT) => {
                        debug!(reader = %name, "badge present");
                        present = true;
                    }
                    Ok(_) => {}
                    Err(e) => trace!(reader = %name, error = %e, "status query failed"),
                }
                // `card` disconnects with LeaveCard on drop.
            }
            present
        }
    }
}
