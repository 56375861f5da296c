use std::{sync::Arc, time::Duration};

use redis_server::{commands::CommandError, resp::RespValue};
use tokio::time::timeout;

use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_handle_rpush_and_lpush() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    let outcome = env
        .exec_command(&client, TestUtils::rpush_command("fruits", &["grape", "apple"]))
        .await;
    assert_eq!(outcome.replies, vec![TestUtils::expected_integer(2)]);
    assert_eq!(outcome.propagate.len(), 1);

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::lpush_command("fruits", &["mango", "kiwi"]),
        TestUtils::expected_integer(4),
    )
    .await;

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::lrange_command("fruits", 0, -1),
        TestUtils::expected_bulk_string_array(&["kiwi", "mango", "grape", "apple"]),
    )
    .await;

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::llen_command("fruits"),
        TestUtils::expected_integer(4),
    )
    .await;
}

#[tokio::test]
async fn test_handle_lrange() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    env.exec_command(
        &client,
        TestUtils::rpush_command("fruits", &["a", "b", "c", "d", "e"]),
    )
    .await;

    let test_cases = vec![
        (0, 1, vec!["a", "b"]),
        (2, 9, vec!["c", "d", "e"]),
        (-2, -1, vec!["d", "e"]),
        (-9, 1, vec!["a", "b"]),
        (3, 1, vec![]),
        (7, 9, vec![]),
    ];

    for (start, stop, expected) in test_cases {
        env.exec_command_immediate_success_response(
            &client,
            TestUtils::lrange_command("fruits", start, stop),
            TestUtils::expected_bulk_string_array(&expected),
        )
        .await;
    }

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::lrange_command("missing", 0, -1),
        RespValue::Array(vec![]),
    )
    .await;
}

#[tokio::test]
async fn test_handle_lpop() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    env.exec_command(&client, TestUtils::rpush_command("fruits", &["a", "b", "c"]))
        .await;

    let outcome = env
        .exec_command(&client, TestUtils::lpop_command("fruits"))
        .await;
    assert_eq!(outcome.replies, vec![TestUtils::expected_bulk_string("a")]);
    assert_eq!(outcome.propagate.len(), 1);

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::lpop_command_multiple_items("fruits", 5),
        TestUtils::expected_bulk_string_array(&["b", "c"]),
    )
    .await;

    let outcome = env
        .exec_command(&client, TestUtils::lpop_command("fruits"))
        .await;
    assert_eq!(outcome.replies, vec![RespValue::Null]);
    assert!(outcome.propagate.is_empty());

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::lpop_command_multiple_items("fruits", 2),
        RespValue::NullArray,
    )
    .await;
}

#[tokio::test]
async fn test_list_commands_on_string_are_wrong_type() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    env.exec_command(&client, TestUtils::set_command("fruit", "mango"))
        .await;

    let test_cases = vec![
        TestUtils::rpush_command("fruit", &["a"]),
        TestUtils::lpush_command("fruit", &["a"]),
        TestUtils::lpop_command("fruit"),
        TestUtils::llen_command("fruit"),
        TestUtils::lrange_command("fruit", 0, -1),
    ];

    for command in test_cases {
        env.exec_command_immediate_error_response(&client, command, CommandError::WrongType)
            .await;
    }
}

#[tokio::test]
async fn test_handle_blpop_immediate() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    env.exec_command(&client, TestUtils::rpush_command("fruits", &["grape"]))
        .await;

    let outcome = env
        .exec_command(&client, TestUtils::blpop_command("fruits", "0"))
        .await;

    assert_eq!(
        outcome.replies,
        vec![TestUtils::expected_bulk_string_array(&["fruits", "grape"])]
    );
    assert_eq!(
        outcome.propagate,
        vec![TestUtils::lpop_command("fruits").to_bytes()]
    );
}

#[tokio::test]
async fn test_handle_blpop_times_out() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    let outcome = env
        .exec_command(&client, TestUtils::blpop_command("fruits", "0.05"))
        .await;

    assert_eq!(outcome.replies, vec![RespValue::NullArray]);
    assert!(outcome.propagate.is_empty());
}

#[tokio::test]
async fn test_handle_blpop_invalid_timeout() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    env.exec_command_immediate_error_response(
        &client,
        TestUtils::blpop_command("fruits", "soon"),
        CommandError::InvalidTimeout,
    )
    .await;

    env.exec_command_immediate_error_response(
        &client,
        TestUtils::blpop_command("fruits", "-1"),
        CommandError::NegativeTimeout,
    )
    .await;
}

#[tokio::test]
async fn test_blpop_wakes_up_on_push_from_other_client() {
    let env = Arc::new(TestEnv::new_master_server());
    let blocked = env.client(41844);
    let pusher = env.client(41845);

    let waiter = {
        let env = Arc::clone(&env);
        tokio::spawn(async move {
            env.exec_command(&blocked, TestUtils::blpop_command("fruits", "0"))
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    env.exec_command(&pusher, TestUtils::rpush_command("fruits", &["grape"]))
        .await;

    let outcome = timeout(Duration::from_secs(1), waiter)
        .await
        .expect("BLPOP did not wake up")
        .unwrap();

    assert_eq!(
        outcome.replies,
        vec![TestUtils::expected_bulk_string_array(&["fruits", "grape"])]
    );
    env.exec_command_immediate_success_response(
        &pusher,
        TestUtils::llen_command("fruits"),
        TestUtils::expected_integer(0),
    )
    .await;
}

#[tokio::test]
async fn test_blpop_concurrent_clients_each_get_one_element() {
    let env = Arc::new(TestEnv::new_master_server());

    let mut waiters = Vec::new();
    for port in [41850, 41851] {
        let env = Arc::clone(&env);
        let client = env.client(port);
        waiters.push(tokio::spawn(async move {
            env.exec_command(&client, TestUtils::blpop_command("fruits", "1"))
                .await
        }));
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    let pusher = env.client(41852);
    env.exec_command(&pusher, TestUtils::rpush_command("fruits", &["a", "b"]))
        .await;

    let mut popped = Vec::new();
    for waiter in waiters {
        let outcome = waiter.await.unwrap();
        popped.push(outcome.replies[0].clone());
    }
    popped.sort_by_key(|reply| format!("{:?}", reply));

    assert_eq!(
        popped,
        vec![
            TestUtils::expected_bulk_string_array(&["fruits", "a"]),
            TestUtils::expected_bulk_string_array(&["fruits", "b"]),
        ]
    );
}

#[tokio::test]
async fn test_blpop_is_cancelled_on_disconnect() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);
    client.disconnect();

    let outcome = timeout(
        Duration::from_secs(1),
        env.exec_command(&client, TestUtils::blpop_command("fruits", "0")),
    )
    .await
    .expect("BLPOP kept blocking after disconnect");

    assert!(outcome.replies.is_empty());
    assert!(outcome.propagate.is_empty());
}
