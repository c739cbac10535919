//! Properties of the context state machine

use proptest::prelude::*;
use rclctx::{Context, ContextError, InitOptions, LifecycleState};

#[derive(Debug, Clone)]
enum Op {
    Init(i64),
    Shutdown,
    TryShutdown,
    DomainId,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-3i64..300).prop_map(Op::Init),
        Just(Op::Shutdown),
        Just(Op::TryShutdown),
        Just(Op::DomainId),
    ]
}

/// Test that any sequence of operations follows Uninitialized -> Initialized -> Shutdown
#[test]
fn test_lifecycle_matches_model() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&prop::collection::vec(op(), 0..12), |ops| {
            // Explicit contexts install no signal handlers, so runs are independent.
            let context = Context::new();
            let mut model = LifecycleState::Uninitialized;
            let mut bound: Option<u64> = None;

            for op in ops {
                match op {
                    Op::Init(id) => {
                        let result = context.init(InitOptions::new().domain_id(id));
                        match model {
                            LifecycleState::Uninitialized if id >= 0 => {
                                prop_assert!(result.is_ok());
                                model = LifecycleState::Initialized;
                                bound = Some(id as u64);
                            }
                            LifecycleState::Uninitialized => {
                                prop_assert!(matches!(result, Err(ContextError::InvalidDomainId(_))));
                            }
                            _ => {
                                prop_assert!(matches!(result, Err(ContextError::AlreadyInitialized)));
                            }
                        }
                    }
                    Op::Shutdown => {
                        let result = context.shutdown();
                        if model == LifecycleState::Initialized {
                            prop_assert!(result.is_ok());
                            model = LifecycleState::Shutdown;
                        } else {
                            prop_assert!(matches!(result, Err(ContextError::NotInitialized)));
                        }
                    }
                    Op::TryShutdown => {
                        prop_assert!(context.try_shutdown().is_ok());
                        if model == LifecycleState::Initialized {
                            model = LifecycleState::Shutdown;
                        }
                    }
                    Op::DomainId => match context.get_domain_id() {
                        Ok(id) => {
                            prop_assert_eq!(model, LifecycleState::Initialized);
                            prop_assert_eq!(Some(id), bound);
                        }
                        Err(e) => {
                            prop_assert!(matches!(e, ContextError::NotInitialized));
                            prop_assert_ne!(model, LifecycleState::Initialized);
                        }
                    },
                }
                prop_assert_eq!(context.state(), model);
                prop_assert_eq!(context.ok(), model == LifecycleState::Initialized);
            }

            Ok(())
        })
        .unwrap();
}
