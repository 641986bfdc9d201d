//! Outbound RPC helpers. Every call is wrapped in a bounded timeout; a dial
//! failure, a transport error and a timeout are all folded into
//! `NodeError::Transport` / `NodeError::Dial` so callers (the maintenance
//! loop, the routing engine, the shell) only need to match on "it worked"
//! vs "treat the peer as dead".

use std::time::Duration;

use tonic::transport::Channel;
use tonic::Request;

use crate::error::NodeError;
use crate::rpc::chord_proto::chord_client::ChordClient;
use crate::rpc::chord_proto::{
    DeleteRequest, Empty, FindSuccessorRequest, GetRequest, JoinRequest, NotifyRequest, PutRequest,
};

const CONNECT_RETRY_SLEEP_MILLIS: u64 = 100;
const JOIN_CONNECT_MAX_RETRIES: u32 = 5;

pub async fn connect(address: &str) -> Result<ChordClient<Channel>, NodeError> {
    ChordClient::connect(format!("http://{address}"))
        .await
        .map_err(|source| NodeError::Dial {
            address: address.to_string(),
            source,
        })
}

/// Retries dialing until `max_retries` is exceeded. A bootstrap peer that is
/// briefly unreachable shouldn't abort the whole join sequence.
pub async fn connect_with_retry(address: &str, max_retries: u32) -> Result<ChordClient<Channel>, NodeError> {
    let mut attempt = 0;
    loop {
        match connect(address).await {
            Ok(client) => return Ok(client),
            Err(err) => {
                attempt += 1;
                if attempt > max_retries {
                    return Err(err);
                }
                tokio::time::sleep(Duration::from_millis(CONNECT_RETRY_SLEEP_MILLIS)).await;
            }
        }
    }
}

async fn with_timeout<T>(
    address: &str,
    timeout: Duration,
    fut: impl std::future::Future<Output = Result<tonic::Response<T>, tonic::Status>>,
) -> Result<T, NodeError> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(response)) => Ok(response.into_inner()),
        Ok(Err(status)) => Err(NodeError::Transport {
            address: address.to_string(),
            source: status,
        }),
        Err(_) => Err(NodeError::Transport {
            address: address.to_string(),
            source: tonic::Status::deadline_exceeded("rpc timed out"),
        }),
    }
}

pub async fn ping(address: &str, timeout: Duration) -> Result<bool, NodeError> {
    let mut client = connect(address).await?;
    let reply = with_timeout(address, timeout, client.ping(Request::new(Empty {}))).await?;
    Ok(reply.value)
}

pub async fn get_predecessor(address: &str, timeout: Duration) -> Result<Option<String>, NodeError> {
    let mut client = connect(address).await?;
    let reply = with_timeout(address, timeout, client.get_predecessor(Request::new(Empty {}))).await?;
    Ok(if reply.address.is_empty() {
        None
    } else {
        Some(reply.address)
    })
}

pub async fn get_successors(address: &str, timeout: Duration) -> Result<Vec<String>, NodeError> {
    let mut client = connect(address).await?;
    let reply = with_timeout(address, timeout, client.get_successors(Request::new(Empty {}))).await?;
    Ok(reply.addresses)
}

pub async fn notify(address: &str, self_address: &str, timeout: Duration) -> Result<(), NodeError> {
    let mut client = connect(address).await?;
    with_timeout(
        address,
        timeout,
        client.notify(Request::new(NotifyRequest {
            address: self_address.to_string(),
        })),
    )
    .await?;
    Ok(())
}

pub async fn find_successor(
    address: &str,
    target: &crate::identifier::Identifier,
    timeout: Duration,
) -> Result<(String, bool), NodeError> {
    let mut client = connect(address).await?;
    let reply = with_timeout(
        address,
        timeout,
        client.find_successor(Request::new(FindSuccessorRequest {
            id: target.to_be_bytes().to_vec(),
        })),
    )
    .await?;
    Ok((reply.address, reply.found))
}

/// Joins through `address`, retrying the initial dial a handful of times so
/// a bootstrap peer that hasn't finished starting up doesn't abort the join.
pub async fn join(address: &str, new_node_address: &str, timeout: Duration) -> Result<String, NodeError> {
    let mut client = connect_with_retry(address, JOIN_CONNECT_MAX_RETRIES).await?;
    let reply = with_timeout(
        address,
        timeout,
        client.join(Request::new(JoinRequest {
            address: new_node_address.to_string(),
        })),
    )
    .await?;
    Ok(reply.address)
}

pub async fn put(address: &str, key: &str, value: &str, timeout: Duration) -> Result<(), NodeError> {
    let mut client = connect(address).await?;
    with_timeout(
        address,
        timeout,
        client.put(Request::new(PutRequest {
            key: key.to_string(),
            value: value.to_string(),
        })),
    )
    .await?;
    Ok(())
}

pub async fn get(address: &str, key: &str, timeout: Duration) -> Result<String, NodeError> {
    let mut client = connect(address).await?;
    let reply = with_timeout(
        address,
        timeout,
        client.get(Request::new(GetRequest {
            key: key.to_string(),
        })),
    )
    .await?;
    Ok(reply.value)
}

pub async fn delete(address: &str, key: &str, timeout: Duration) -> Result<(), NodeError> {
    let mut client = connect(address).await?;
    with_timeout(
        address,
        timeout,
        client.delete(Request::new(DeleteRequest {
            key: key.to_string(),
        })),
    )
    .await?;
    Ok(())
}
