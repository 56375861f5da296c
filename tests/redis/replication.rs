use std::{sync::Arc, time::Duration};

use redis_server::{
    commands::CommandError,
    replication::{HandshakeState, is_valid_repl_id},
    resp::RespValue,
};
use tokio::time::timeout;

use crate::test_utils::{TestClient, TestEnv, TestUtils};

/// Runs the leader side of a replica handshake and checks the `+FULLRESYNC`
/// line and snapshot transfer it pushes.
async fn attach_replica(env: &TestEnv, replica: &mut TestClient, listening_port: u16) {
    let port = listening_port.to_string();

    env.exec_command_immediate_success_response(
        replica,
        TestUtils::command(&["REPLCONF", "listening-port", &port]),
        TestUtils::expected_simple_string("OK"),
    )
    .await;
    assert_eq!(
        env.server
            .replication
            .handshake_state(&replica.context.client_address)
            .await,
        HandshakeState::AwaitingPsync { listening_port }
    );

    env.exec_command_immediate_success_response(
        replica,
        TestUtils::command(&["REPLCONF", "capa", "psync2"]),
        TestUtils::expected_simple_string("OK"),
    )
    .await;

    let outcome = env
        .exec_command(replica, TestUtils::command(&["PSYNC", "?", "-1"]))
        .await;
    assert!(outcome.replies.is_empty());

    let RespValue::SimpleString(header) = replica.next_pushed().await else {
        panic!("expected +FULLRESYNC");
    };
    let parts: Vec<&str> = header.split(' ').collect();
    assert_eq!(parts[0], "FULLRESYNC");
    assert!(is_valid_repl_id(parts[1]));
    assert_eq!(parts[1], env.server.replication.repl_id());

    let snapshot = replica.next_raw().await;
    let (payload, consumed) = RespValue::decode_bulk_payload(&snapshot).unwrap().unwrap();
    assert_eq!(consumed, snapshot.len());
    assert!(payload.starts_with(b"REDIS"));
}

#[tokio::test]
async fn test_wait_without_replicas() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::wait_command(0, 0),
        TestUtils::expected_integer(0),
    )
    .await;

    let outcome = timeout(
        Duration::from_secs(1),
        env.exec_command(&client, TestUtils::wait_command(3, 0)),
    )
    .await
    .expect("WAIT blocked without replicas");
    assert_eq!(outcome.replies, vec![TestUtils::expected_integer(0)]);
}

#[tokio::test]
async fn test_psync_registers_replica_and_forwards_writes() {
    let env = TestEnv::new_master_server();
    let mut replica = env.client(51000);
    let client = env.client(41844);

    attach_replica(&env, &mut replica, 6380).await;
    assert_eq!(env.server.replication.replica_count().await, 1);
    assert_eq!(
        env.server
            .replication
            .handshake_state(&replica.context.client_address)
            .await,
        HandshakeState::FullResyncSent
    );

    let set = TestUtils::set_command("fruit", "mango");
    let outcome = env.exec_command(&client, set.clone()).await;
    assert_eq!(outcome.propagate, vec![set.to_bytes()]);

    assert_eq!(replica.next_raw().await, set.to_bytes());
    assert_eq!(env.server.replication.offset().await, 1);

    let get = env.exec_command(&client, TestUtils::get_command("fruit")).await;
    assert!(get.propagate.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_reach_replica_in_applied_order() {
    let env = Arc::new(TestEnv::new_master_server());
    let mut replica = env.client(51000);
    attach_replica(&env, &mut replica, 6380).await;

    let writers: Vec<_> = (0..8u16)
        .map(|writer| {
            let env = Arc::clone(&env);
            tokio::spawn(async move {
                let client = env.client(42000 + writer);
                for i in 0..50 {
                    let value = format!("c{}-{}", writer, i);
                    let command = TestUtils::rpush_command("k", &[value.as_str()]);
                    env.exec_command(&client, command).await;
                }
            })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap();
    }

    let mut forwarded = Vec::new();
    while let Ok(bytes) = replica.receiver.try_recv() {
        let (frames, _) = RespValue::decode(&bytes);
        for frame in frames {
            let RespValue::Array(words) = frame.value else {
                continue;
            };
            if let [RespValue::BulkString(name), _, value] = words.as_slice() {
                if name == "RPUSH" {
                    forwarded.push(value.clone());
                }
            }
        }
    }
    assert_eq!(forwarded.len(), 400);

    let client = env.client(41844);
    env.exec_command_immediate_success_response(
        &client,
        TestUtils::lrange_command("k", 0, -1),
        RespValue::Array(forwarded),
    )
    .await;
}

#[tokio::test]
async fn test_exec_forwards_each_write_of_the_transaction() {
    let env = TestEnv::new_master_server();
    let mut replica = env.client(51000);
    let client = env.client(41844);
    attach_replica(&env, &mut replica, 6380).await;

    let set = TestUtils::set_command("fruit", "mango");
    let incr = TestUtils::incr_command("counter");

    env.exec_command(&client, TestUtils::multi_command()).await;
    env.exec_command(&client, set.clone()).await;
    env.exec_command(&client, TestUtils::get_command("fruit")).await;
    env.exec_command(&client, incr.clone()).await;
    assert!(!replica.has_pushed());

    let outcome = env.exec_command(&client, TestUtils::exec_command()).await;
    assert_eq!(outcome.propagate, vec![set.to_bytes(), incr.to_bytes()]);

    assert_eq!(replica.next_raw().await, set.to_bytes());
    assert_eq!(replica.next_raw().await, incr.to_bytes());
    assert_eq!(env.server.replication.offset().await, 2);
}

#[tokio::test]
async fn test_psync_rejects_partial_resync() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);

    env.exec_command_immediate_error_response(
        &client,
        TestUtils::command(&["PSYNC", "8371b4fb1155b71f4a04d3e1bc3e18c4a990aeeb", "12"]),
        CommandError::UnsupportedPsync,
    )
    .await;
    assert_eq!(env.server.replication.replica_count().await, 0);
}

#[tokio::test]
async fn test_snapshot_carries_existing_keys() {
    let env = TestEnv::new_master_server();
    let client = env.client(41844);
    let mut replica = env.client(51000);

    env.exec_command(&client, TestUtils::set_command("fruit", "mango"))
        .await;

    env.exec_command(&replica, TestUtils::command(&["PSYNC", "?", "-1"]))
        .await;
    replica.next_pushed().await;
    let snapshot = replica.next_raw().await;
    let (payload, _) = RespValue::decode_bulk_payload(&snapshot).unwrap().unwrap();

    let follower = TestEnv::new_replica_server();
    assert!(follower.get_store().await.restore(&payload));
    assert_eq!(
        follower.get_store().await.get("fruit"),
        Ok(Some("mango".to_string()))
    );
}

#[tokio::test]
async fn test_wait_counts_acknowledged_replicas() {
    let env = Arc::new(TestEnv::new_master_server());
    let mut replica = env.client(51000);
    let client = env.client(41844);

    attach_replica(&env, &mut replica, 6380).await;

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::wait_command(1, 500),
        TestUtils::expected_integer(1),
    )
    .await;

    env.exec_command(&client, TestUtils::set_command("fruit", "mango"))
        .await;
    replica.next_raw().await;

    let waiter = {
        let env = Arc::clone(&env);
        tokio::spawn(async move {
            env.exec_command(&client, TestUtils::wait_command(1, 2000))
                .await
        })
    };

    assert_eq!(
        replica.next_pushed().await,
        TestUtils::expected_bulk_string_array(&["REPLCONF", "GETACK", "*"])
    );

    let ack = env
        .exec_command(&replica, TestUtils::command(&["REPLCONF", "ACK", "1"]))
        .await;
    assert!(ack.replies.is_empty());

    let outcome = timeout(Duration::from_secs(1), waiter)
        .await
        .expect("WAIT did not see the acknowledgement")
        .unwrap();
    assert_eq!(outcome.replies, vec![TestUtils::expected_integer(1)]);
}

#[tokio::test]
async fn test_wait_times_out_with_lagging_replica() {
    let env = TestEnv::new_master_server();
    let mut replica = env.client(51000);
    let client = env.client(41844);

    attach_replica(&env, &mut replica, 6380).await;
    env.server
        .replication
        .propagate(TestUtils::set_command("fruit", "mango").to_bytes())
        .await;

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::wait_command(1, 100),
        TestUtils::expected_integer(0),
    )
    .await;
}

#[tokio::test]
async fn test_disconnected_replica_is_forgotten() {
    let env = TestEnv::new_master_server();
    let mut replica = env.client(51000);

    attach_replica(&env, &mut replica, 6380).await;
    env.server
        .replication
        .remove_client(&replica.context.client_address)
        .await;

    assert_eq!(env.server.replication.replica_count().await, 0);
}

#[tokio::test]
async fn test_follower_applies_leader_stream_silently() {
    let env = TestEnv::new_replica_server();
    let leader = env.leader_connection();
    let client = env.client(41844);

    let test_cases = vec![
        TestUtils::set_command("fruit", "mango"),
        TestUtils::rpush_command("fruits", &["kiwi", "grape"]),
        TestUtils::incr_command("counter"),
        TestUtils::ping_command(),
    ];

    for command in test_cases {
        let outcome = env.exec_command(&leader, command).await;
        assert!(outcome.replies.is_empty());
        assert!(outcome.propagate.is_empty());
    }

    assert_eq!(env.server.replication.offset().await, 3);

    env.exec_command_immediate_success_response(
        &client,
        TestUtils::get_command("fruit"),
        TestUtils::expected_bulk_string("mango"),
    )
    .await;
    env.exec_command_immediate_success_response(
        &client,
        TestUtils::llen_command("fruits"),
        TestUtils::expected_integer(2),
    )
    .await;

    env.exec_command_immediate_success_response(
        &leader,
        TestUtils::command(&["REPLCONF", "GETACK", "*"]),
        TestUtils::expected_bulk_string_array(&["REPLCONF", "ACK", "3"]),
    )
    .await;
}

#[tokio::test]
async fn test_follower_ignores_malformed_leader_commands() {
    let env = TestEnv::new_replica_server();
    let leader = env.leader_connection();

    let outcome = env
        .exec_command(&leader, RespValue::simple_string("garbage"))
        .await;
    assert!(outcome.replies.is_empty());

    let outcome = env
        .exec_command(&leader, TestUtils::command(&["FROBNICATE"]))
        .await;
    assert!(outcome.replies.is_empty());
    assert_eq!(env.server.replication.offset().await, 0);
}
