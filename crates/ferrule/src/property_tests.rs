//! Property-based tests for ferrule
//!
//! Invariants of error collection, permission resolution and the
//! communicator pool checked over generated inputs.

#[cfg(test)]
mod tests {
    use crate::communicators::{CommunicatorPool, FastCommunicator, SlowCommunicator};
    use crate::errors::{ErrorCatalogue, ErrorCollection, NO_REFERENCE, reference};
    use ferrule_protocol::{Action, PermissionDecision, Permissions};
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // ===== Strategy Generators =====

    fn arb_reference_value() -> impl Strategy<Value = String> {
        "[a-z,\\\\ ]{0,12}"
    }

    fn arb_status() -> impl Strategy<Value = u16> {
        400u16..600u16
    }

    fn arb_action() -> impl Strategy<Value = Action> {
        prop_oneof![
            Just(Action::List),
            Just(Action::Show),
            Just(Action::Create),
            Just(Action::Update),
            Just(Action::Delete),
        ]
    }

    fn arb_decision() -> impl Strategy<Value = PermissionDecision> {
        prop_oneof![
            Just(PermissionDecision::Allow),
            Just(PermissionDecision::Deny),
            Just(PermissionDecision::Ask),
        ]
    }

    // ===== Error Collection Properties =====

    proptest! {
        /// Joined reference values split back into the same values
        #[test]
        fn prop_reference_round_trips(values in prop::collection::vec(arb_reference_value(), 1..6)) {
            prop_assert_eq!(reference::split(&reference::join(&values)), values);
        }

        /// The first error added fixes the collection's status
        #[test]
        fn prop_first_error_pins_status(statuses in prop::collection::vec(arb_status(), 1..8)) {
            let mut catalogue = ErrorCatalogue::empty();
            for (index, status) in statuses.iter().enumerate() {
                catalogue
                    .describe(&format!("test.error_{index}"), "failed", &[], Some(*status))
                    .unwrap();
            }
            let mut errors = ErrorCollection::new(Arc::new(catalogue));
            for index in 0..statuses.len() {
                errors.add(&format!("test.error_{index}")).unwrap();
                prop_assert_eq!(errors.http_status(), statuses[0]);
            }
            prop_assert_eq!(errors.errors().len(), statuses.len());
        }

        /// Only catalogued codes are accepted
        #[test]
        fn prop_uncatalogued_codes_are_rejected(name in "[a-z_]{1,16}") {
            let mut errors = ErrorCollection::new(Arc::new(ErrorCatalogue::default()));
            let code = format!("unlisted.{name}");
            prop_assert!(errors.add_error(&code, NO_REFERENCE, None).is_err());
            prop_assert!(!errors.has_errors());
            prop_assert_eq!(errors.http_status(), 200);
        }
    }

    // ===== Permission Properties =====

    proptest! {
        /// A resource-action decision beats every other level
        #[test]
        fn prop_resource_action_takes_precedence(
            action in arb_action(),
            specific in arb_decision(),
            fallback in arb_decision(),
        ) {
            let permissions = Permissions::new()
                .with_default(fallback)
                .with_resource("Purchase", fallback)
                .with_resource_action("Purchase", action, specific);
            prop_assert_eq!(permissions.permitted("Purchase", action), specific);
        }

        /// Merging never loses the other tree's decisions
        #[test]
        fn prop_merge_prefers_other(
            action in arb_action(),
            mine in arb_decision(),
            theirs in arb_decision(),
        ) {
            let base = Permissions::new().with_resource_action("Refund", action, mine);
            let extra = Permissions::new().with_resource_action("Refund", action, theirs);
            prop_assert_eq!(base.merge(&extra).permitted("Refund", action), theirs);
        }
    }

    // ===== Communicator Pool Properties =====

    struct Counting(Arc<AtomicUsize>);

    impl FastCommunicator<u32> for Counting {
        fn communicate(&self, _message: &u32) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl SlowCommunicator<u32> for Counting {
        fn communicate(&self, _message: u32) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        /// Every message reaches every listener when mailboxes are large enough
        #[test]
        fn prop_all_messages_delivered(count in 1usize..40) {
            let fast = Arc::new(AtomicUsize::new(0));
            let slow = Arc::new(AtomicUsize::new(0));
            let pool = CommunicatorPool::with_capacity(64);
            pool.add_fast(Counting(Arc::clone(&fast)));
            pool.add_slow(Counting(Arc::clone(&slow)));

            for message in 0..count {
                pool.communicate(message as u32);
            }
            prop_assert!(pool.terminate(Duration::from_secs(5)));
            prop_assert_eq!(fast.load(Ordering::SeqCst), count);
            prop_assert_eq!(slow.load(Ordering::SeqCst), count);
        }
    }
}
