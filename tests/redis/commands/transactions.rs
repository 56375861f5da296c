use redis_server::{commands::CommandError, resp::RespValue};

use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_multi_exec() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);
    let other = env.client(41845);

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::multi_command(),
        TestUtils::expected_simple_string("OK"),
    )
    .await;

    let queued = vec![
        TestUtils::set_command("counter", "1"),
        TestUtils::incr_command("counter"),
        TestUtils::get_command("counter"),
    ];
    for command in &queued {
        let outcome = env.exec_command(&client, command.clone()).await;
        assert_eq!(
            outcome.replies,
            vec![TestUtils::expected_simple_string("QUEUED")]
        );
        assert!(outcome.propagate.is_empty());
    }

    let queued_len = env
        .get_state()
        .await
        .get_transaction(&client.context.client_address)
        .map(Vec::len);
    assert_eq!(queued_len, Some(3));

    env.exec_command_immediate_success_response(
        &other,
        TestUtils::get_command("counter"),
        RespValue::Null,
    )
    .await;

    let outcome = env.exec_command(&client, TestUtils::exec_command()).await;
    assert_eq!(
        outcome.replies,
        vec![RespValue::Array(vec![
            TestUtils::expected_simple_string("OK"),
            TestUtils::expected_integer(2),
            TestUtils::expected_bulk_string("2"),
        ])]
    );
    assert_eq!(
        outcome.propagate,
        vec![queued[0].to_bytes(), queued[1].to_bytes()]
    );
    assert!(
        !env.get_state()
            .await
            .in_transaction(&client.context.client_address)
    );
}

#[tokio::test]
async fn test_exec_empty_transaction() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    env.exec_command(&client, TestUtils::multi_command()).await;
    env.exec_command_immediate_success_response(
        &client,
        TestUtils::exec_command(),
        RespValue::Array(vec![]),
    )
    .await;
}

#[tokio::test]
async fn test_exec_without_multi() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    env.exec_command_immediate_error_response(
        &client,
        TestUtils::exec_command(),
        CommandError::ExecWithoutMulti,
    )
    .await;

    env.exec_command_immediate_error_response(
        &client,
        TestUtils::discard_command(),
        CommandError::DiscardWithoutMulti,
    )
    .await;
}

#[tokio::test]
async fn test_nested_multi_keeps_queue() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    env.exec_command(&client, TestUtils::multi_command()).await;
    env.exec_command(&client, TestUtils::set_command("fruit", "mango"))
        .await;

    env.exec_command_immediate_error_response(
        &client,
        TestUtils::multi_command(),
        CommandError::NestedMulti,
    )
    .await;

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::exec_command(),
        RespValue::Array(vec![TestUtils::expected_simple_string("OK")]),
    )
    .await;
}

#[tokio::test]
async fn test_discard() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    env.exec_command(&client, TestUtils::multi_command()).await;
    env.exec_command(&client, TestUtils::set_command("fruit", "mango"))
        .await;

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::discard_command(),
        TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::get_command("fruit"),
        RespValue::Null,
    )
    .await;

    env.exec_command_immediate_error_response(
        &client,
        TestUtils::exec_command(),
        CommandError::ExecWithoutMulti,
    )
    .await;
}

#[tokio::test]
async fn test_invalid_arguments_are_rejected_at_queue_time() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    env.exec_command(&client, TestUtils::multi_command()).await;

    env.exec_command_immediate_error_response(
        &client,
        TestUtils::command(&["GET"]),
        CommandError::arity("get"),
    )
    .await;

    env.exec_command_immediate_error_response(
        &client,
        TestUtils::command(&["FROBNICATE"]),
        CommandError::UnknownCommand("frobnicate".to_string()),
    )
    .await;

    env.exec_command(&client, TestUtils::set_command("fruit", "mango"))
        .await;

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::exec_command(),
        RespValue::Array(vec![TestUtils::expected_simple_string("OK")]),
    )
    .await;
}

#[tokio::test]
async fn test_runtime_errors_inside_transaction() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    env.exec_command(&client, TestUtils::set_command("fruit", "mango"))
        .await;

    env.exec_command(&client, TestUtils::multi_command()).await;
    env.exec_command(&client, TestUtils::incr_command("fruit"))
        .await;
    env.exec_command(&client, TestUtils::incr_command("counter"))
        .await;

    let outcome = env.exec_command(&client, TestUtils::exec_command()).await;
    assert_eq!(
        outcome.replies,
        vec![RespValue::Array(vec![
            CommandError::NotAnInteger.as_resp(),
            TestUtils::expected_integer(1),
        ])]
    );
    assert_eq!(
        outcome.propagate,
        vec![TestUtils::incr_command("counter").to_bytes()]
    );

    env.exec_command(&client, TestUtils::multi_command()).await;
    env.exec_command(&client, TestUtils::incr_command("fruit"))
        .await;

    env.exec_command_immediate_error_response(
        &client,
        TestUtils::exec_command(),
        CommandError::NotAnInteger,
    )
    .await;
}

#[tokio::test]
async fn test_transactions_are_per_connection() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);
    let other = env.client(41845);

    env.exec_command(&client, TestUtils::multi_command()).await;

    env.exec_command_immediate_success_response(
        &other,
        TestUtils::set_command("fruit", "mango"),
        TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_error_response(
        &other,
        TestUtils::exec_command(),
        CommandError::ExecWithoutMulti,
    )
    .await;
}
