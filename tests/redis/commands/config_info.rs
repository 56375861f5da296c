use std::path::PathBuf;

use redis_server::{commands::CommandError, config::ServerConfig, resp::RespValue};

use crate::test_utils::{TestEnv, TestUtils};

fn info_lines(reply: &RespValue) -> Vec<String> {
    let RespValue::BulkString(text) = reply else {
        panic!("INFO should reply with a bulk string, got {:?}", reply);
    };
    text.split("\r\n").map(str::to_string).collect()
}

#[tokio::test]
async fn test_handle_config_get() {
    let env = TestEnv::from_config(ServerConfig {
        dir: PathBuf::from("/var/lib/redis"),
        dbfilename: "snapshot.rdb".to_string(),
        ..ServerConfig::default()
    });
    let client = env.client(41844);

    let test_cases = vec![
        (
            vec!["CONFIG", "GET", "dir"],
            vec!["dir", "/var/lib/redis"],
        ),
        (
            vec!["config", "get", "DBFILENAME"],
            vec!["dbfilename", "snapshot.rdb"],
        ),
        (
            vec!["CONFIG", "GET", "dir", "maxmemory", "dbfilename"],
            vec!["dir", "/var/lib/redis", "dbfilename", "snapshot.rdb"],
        ),
        (vec!["CONFIG", "GET", "maxmemory"], vec![]),
    ];

    for (command, expected) in test_cases {
        env.exec_command_immediate_success_response(
            &client,
            TestUtils::command(&command),
            TestUtils::expected_bulk_string_array(&expected),
        )
        .await;
    }

    env.exec_command_immediate_error_response(
        &client,
        TestUtils::command(&["CONFIG", "GET"]),
        CommandError::arity("config|get"),
    )
    .await;

    env.exec_command_immediate_error_response(
        &client,
        TestUtils::command(&["CONFIG", "SET", "dir", "/tmp"]),
        CommandError::UnknownSubcommand("SET".to_string()),
    )
    .await;
}

#[tokio::test]
async fn test_handle_info_on_master() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    for command in [vec!["INFO"], vec!["INFO", "replication"]] {
        let outcome = env.exec_command(&client, TestUtils::command(&command)).await;
        let lines = info_lines(&outcome.replies[0]);

        assert_eq!(lines[0], "# Replication");
        assert!(lines.contains(&"role:master".to_string()));
        assert!(lines.contains(&"connected_slaves:0".to_string()));
        assert!(lines.contains(&"master_repl_offset:0".to_string()));

        let repl_id = lines
            .iter()
            .find_map(|line| line.strip_prefix("master_replid:"))
            .unwrap();
        assert_eq!(repl_id.len(), 40);
        assert!(repl_id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    env.exec_command_immediate_error_response(
        &client,
        TestUtils::command(&["INFO", "keyspace"]),
        CommandError::SyntaxError,
    )
    .await;
}

#[tokio::test]
async fn test_handle_info_on_replica() {
    let env = TestEnv::new_replica_server();
    let client = env.client(41844);

    let outcome = env.exec_command(&client, TestUtils::command(&["INFO"])).await;
    let lines = info_lines(&outcome.replies[0]);

    assert!(lines.contains(&"role:slave".to_string()));
}

#[tokio::test]
async fn test_replica_rejects_client_writes() {
    let env = TestEnv::new_replica_server();
    let client = env.client(41844);

    let test_cases = vec![
        TestUtils::set_command("fruit", "mango"),
        TestUtils::incr_command("counter"),
        TestUtils::rpush_command("fruits", &["mango"]),
        TestUtils::xadd_command("weather", "1-1", &["t", "30"]),
    ];

    for command in test_cases {
        env.exec_command_immediate_error_response(&client, command, CommandError::ReadOnlyReplica)
            .await;
    }

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::get_command("fruit"),
        RespValue::Null,
    )
    .await;
}

#[tokio::test]
async fn test_wait_on_replica_is_rejected() {
    let env = TestEnv::new_replica_server();
    let client = env.client(41844);

    env.exec_command_immediate_error_response(
        &client,
        TestUtils::wait_command(1, 100),
        CommandError::WaitOnReplica,
    )
    .await;
}

#[tokio::test]
async fn test_wait_arguments() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    let test_cases = vec![
        (TestUtils::command(&["WAIT", "1"]), CommandError::arity("wait")),
        (
            TestUtils::command(&["WAIT", "one", "100"]),
            CommandError::NotAnInteger,
        ),
        (
            TestUtils::command(&["WAIT", "1", "-5"]),
            CommandError::NegativeTimeout,
        ),
    ];

    for (command, expected) in test_cases {
        env.exec_command_immediate_error_response(&client, command, expected)
            .await;
    }
}
