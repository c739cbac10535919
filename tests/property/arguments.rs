//! Properties of reserved argument parsing

use proptest::prelude::*;
use rclctx::arguments::{parse_arguments, remove_ros_args, ROS_ARGS_END, ROS_ARGS_FLAG};

/// Plain tokens that are never reserved markers.
fn plain_token() -> impl Strategy<Value = String> {
    "[a-z0-9_./:=-]{0,12}".prop_filter("reserved marker", |s| {
        s != ROS_ARGS_FLAG && s != ROS_ARGS_END
    })
}

/// Reserved blocks made only of known flags.
fn ros_block() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![
            "[a-z]{1,8}".prop_map(|to| vec!["-r".to_string(), format!("from:={}", to)]),
            "[a-z]{1,8}".prop_map(|v| vec!["-p".to_string(), format!("param:={}", v)]),
            Just(vec!["--log-level".to_string(), "debug".to_string()]),
            Just(vec!["--disable-stdout-logs".to_string()]),
        ],
        0..4,
    )
    .prop_map(|flags| {
        let mut block = vec![ROS_ARGS_FLAG.to_string()];
        block.extend(flags.into_iter().flatten());
        block
    })
}

/// Test that removing reserved blocks keeps every user token in order
#[test]
fn test_remove_ros_args_preserves_user_tokens() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                prop::collection::vec(plain_token(), 0..6),
                ros_block(),
                prop::collection::vec(plain_token(), 0..6),
            ),
            |(before, block, after)| {
                let mut args = before.clone();
                args.extend(block);
                args.push(ROS_ARGS_END.to_string());
                args.extend(after.clone());

                let remaining = remove_ros_args(&args).unwrap();
                let expected: Vec<String> = before.into_iter().chain(after).collect();
                prop_assert_eq!(remaining, expected);

                Ok(())
            },
        )
        .unwrap();
}

/// Test that parsing and removal agree on the non-reserved tokens
#[test]
fn test_parse_and_remove_agree() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(prop::collection::vec(plain_token(), 0..6), ros_block()),
            |(user, block)| {
                let mut args = user;
                args.extend(block);

                let parsed = parse_arguments(&args).unwrap();
                let removed = remove_ros_args(&args).unwrap();
                prop_assert_eq!(parsed.non_ros_args, removed);

                Ok(())
            },
        )
        .unwrap();
}

/// Test that arguments without reserved blocks pass through untouched
#[test]
fn test_plain_arguments_untouched() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&prop::collection::vec(plain_token(), 0..10), |args| {
            let parsed = parse_arguments(&args).unwrap();
            prop_assert_eq!(&parsed.non_ros_args, &args);
            prop_assert!(parsed.remap_rules.is_empty());
            prop_assert!(parsed.parameter_overrides.is_empty());
            Ok(())
        })
        .unwrap();
}
