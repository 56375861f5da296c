use std::{sync::Arc, time::Duration};

use redis_server::{commands::CommandError, resp::RespValue, stream::StreamError};
use tokio::time::timeout;

use crate::test_utils::{TestEnv, TestUtils};

fn expected_entry(id: &str, fields: &[&str]) -> RespValue {
    RespValue::Array(vec![
        TestUtils::expected_bulk_string(id),
        TestUtils::expected_bulk_string_array(fields),
    ])
}

fn expected_stream(key: &str, entries: Vec<RespValue>) -> RespValue {
    RespValue::Array(vec![
        TestUtils::expected_bulk_string(key),
        RespValue::Array(entries),
    ])
}

#[tokio::test]
async fn test_handle_xadd_explicit_ids() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    let command = TestUtils::xadd_command("weather", "1-1", &["temperature", "36"]);
    let outcome = env.exec_command(&client, command.clone()).await;
    assert_eq!(outcome.replies, vec![TestUtils::expected_bulk_string("1-1")]);
    assert_eq!(outcome.propagate, vec![command.to_bytes()]);

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::xadd_command("weather", "1-2", &["temperature", "37"]),
        TestUtils::expected_bulk_string("1-2"),
    )
    .await;

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::type_command("weather"),
        TestUtils::expected_simple_string("stream"),
    )
    .await;
}

#[tokio::test]
async fn test_handle_xadd_rejects_ids() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    env.exec_command_immediate_error_response(
        &client,
        TestUtils::xadd_command("weather", "0-0", &["temperature", "36"]),
        CommandError::InvalidStreamId(StreamError::IdIsZero),
    )
    .await;

    env.exec_command(
        &client,
        TestUtils::xadd_command("weather", "5-3", &["temperature", "36"]),
    )
    .await;

    let test_cases = ["5-3", "5-2", "4-9"];
    for id in test_cases {
        env.exec_command_immediate_error_response(
            &client,
            TestUtils::xadd_command("weather", id, &["temperature", "36"]),
            CommandError::InvalidStreamId(StreamError::IdTooSmall),
        )
        .await;
    }

    env.exec_command_immediate_error_response(
        &client,
        TestUtils::xadd_command("weather", "abc", &["temperature", "36"]),
        CommandError::InvalidStreamId(StreamError::InvalidId("abc".to_string())),
    )
    .await;

    env.exec_command_immediate_error_response(
        &client,
        TestUtils::xadd_command("weather", "6-0", &["temperature"]),
        CommandError::arity("xadd"),
    )
    .await;
}

#[tokio::test]
async fn test_handle_xadd_rejected_id_does_not_create_stream() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    env.exec_command(
        &client,
        TestUtils::xadd_command("weather", "0-0", &["temperature", "36"]),
    )
    .await;

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::type_command("weather"),
        TestUtils::expected_simple_string("none"),
    )
    .await;
}

#[tokio::test]
async fn test_handle_xadd_generated_sequence() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::xadd_command("weather", "0-*", &["temperature", "36"]),
        TestUtils::expected_bulk_string("0-1"),
    )
    .await;

    env.exec_command(
        &client,
        TestUtils::xadd_command("other", "1-1", &["temperature", "36"]),
    )
    .await;

    let outcome = env
        .exec_command(
            &client,
            TestUtils::xadd_command("other", "1-*", &["temperature", "37"]),
        )
        .await;
    assert_eq!(outcome.replies, vec![TestUtils::expected_bulk_string("1-2")]);
    assert_eq!(
        outcome.propagate,
        vec![TestUtils::xadd_command("other", "1-2", &["temperature", "37"]).to_bytes()]
    );

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::xadd_command("other", "2-*", &["temperature", "38"]),
        TestUtils::expected_bulk_string("2-0"),
    )
    .await;
}

#[tokio::test]
async fn test_handle_xadd_generated_id() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    let outcome = env
        .exec_command(
            &client,
            TestUtils::xadd_command("weather", "*", &["temperature", "36"]),
        )
        .await;

    let [RespValue::BulkString(id)] = outcome.replies.as_slice() else {
        panic!("expected a bulk string id, got {:?}", outcome.replies);
    };
    let (ms, seq) = id.split_once('-').unwrap();
    assert!(ms.parse::<u64>().unwrap() > 0);
    assert_eq!(seq, "0");
    assert_eq!(
        outcome.propagate,
        vec![TestUtils::xadd_command("weather", id, &["temperature", "36"]).to_bytes()]
    );
}

#[tokio::test]
async fn test_handle_xrange() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    for (id, value) in [("1-1", "a"), ("1-2", "b"), ("2-0", "c")] {
        env.exec_command(&client, TestUtils::xadd_command("letters", id, &["l", value]))
            .await;
    }

    let test_cases = vec![
        (
            "-",
            "+",
            vec![
                expected_entry("1-1", &["l", "a"]),
                expected_entry("1-2", &["l", "b"]),
                expected_entry("2-0", &["l", "c"]),
            ],
        ),
        (
            "1",
            "1",
            vec![
                expected_entry("1-1", &["l", "a"]),
                expected_entry("1-2", &["l", "b"]),
            ],
        ),
        ("1-2", "+", vec![
            expected_entry("1-2", &["l", "b"]),
            expected_entry("2-0", &["l", "c"]),
        ]),
        ("3", "+", vec![]),
        ("2", "1", vec![]),
    ];

    for (start, end, expected) in test_cases {
        env.exec_command_immediate_success_response(
            &client,
            TestUtils::xrange_command("letters", start, end),
            RespValue::Array(expected),
        )
        .await;
    }

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::xrange_command("missing", "-", "+"),
        RespValue::Array(vec![]),
    )
    .await;
}

#[tokio::test]
async fn test_handle_xread() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    env.exec_command(&client, TestUtils::xadd_command("a", "1-1", &["n", "1"]))
        .await;
    env.exec_command(&client, TestUtils::xadd_command("a", "1-2", &["n", "2"]))
        .await;
    env.exec_command(&client, TestUtils::xadd_command("b", "5-0", &["n", "3"]))
        .await;

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::xread_command(&["a", "b"], &["1-1", "0-0"]),
        RespValue::Array(vec![
            expected_stream("a", vec![expected_entry("1-2", &["n", "2"])]),
            expected_stream("b", vec![expected_entry("5-0", &["n", "3"])]),
        ]),
    )
    .await;

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::xread_command(&["a", "b"], &["1-2", "5-0"]),
        RespValue::NullArray,
    )
    .await;

    env.exec_command_immediate_error_response(
        &client,
        TestUtils::xread_command(&["a", "b"], &["1-2"]),
        CommandError::SyntaxError,
    )
    .await;
}

#[tokio::test]
async fn test_xread_blocking_times_out() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::xread_blocking_command("50", &["weather"], &["$"]),
        RespValue::NullArray,
    )
    .await;

    assert!(!env.get_store().await.has_observers("weather"));
}

#[tokio::test]
async fn test_xread_blocking_wakes_up_on_xadd() {
    let env = Arc::new(TestEnv::new_master_server());
    let reader = env.client(41844);
    let writer = env.client(41845);

    env.exec_command(&writer, TestUtils::xadd_command("weather", "1-0", &["t", "30"]))
        .await;

    let waiter = {
        let env = Arc::clone(&env);
        tokio::spawn(async move {
            env.exec_command(
                &reader,
                TestUtils::xread_blocking_command("0", &["weather"], &["$"]),
            )
            .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    env.exec_command(&writer, TestUtils::xadd_command("weather", "2-0", &["t", "31"]))
        .await;

    let outcome = timeout(Duration::from_secs(1), waiter)
        .await
        .expect("XREAD did not wake up")
        .unwrap();

    assert_eq!(
        outcome.replies,
        vec![RespValue::Array(vec![expected_stream(
            "weather",
            vec![expected_entry("2-0", &["t", "31"])],
        )])]
    );
}

#[tokio::test]
async fn test_xread_blocking_is_cancelled_on_disconnect() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);
    client.disconnect();

    let outcome = timeout(
        Duration::from_secs(1),
        env.exec_command(
            &client,
            TestUtils::xread_blocking_command("0", &["weather"], &["$"]),
        ),
    )
    .await
    .expect("XREAD kept blocking after disconnect");

    assert!(outcome.replies.is_empty());
    assert!(!env.get_store().await.has_observers("weather"));
}
