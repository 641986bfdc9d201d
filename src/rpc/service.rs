//! The gRPC endpoint: one handler per peer-facing operation. Handlers
//! snapshot state under the field locks, never hold a lock across an
//! outbound call, and convert every `NodeError` into a `tonic::Status` at
//! the boundary so no internal error type crosses the wire.

use log::{debug, info};
use tonic::{Request, Response, Status};

use crate::bucket::Bucket;
use crate::identifier::Identifier;
use crate::maintenance::handle_notify;
use crate::routing::find_successor_locally;
use crate::state::NodeState;

use super::chord_proto::chord_server::Chord;
use super::chord_proto::{
    BoolMsg, DeleteRequest, Empty, FindSuccessorRequest, FindSuccessorResponse, GetPredecessorResponse,
    GetRequest, GetResponse, JoinRequest, JoinResponse, NotifyRequest, PutRequest, SuccessorListMsg,
};

pub struct ChordService {
    state: NodeState,
    rpc_timeout: std::time::Duration,
}

impl ChordService {
    pub fn new(state: NodeState, rpc_timeout: std::time::Duration) -> Self {
        ChordService { state, rpc_timeout }
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }
}

#[tonic::async_trait]
impl Chord for ChordService {
    async fn ping(&self, _request: Request<Empty>) -> Result<Response<BoolMsg>, Status> {
        Ok(Response::new(BoolMsg { value: true }))
    }

    async fn get_predecessor(&self, _request: Request<Empty>) -> Result<Response<GetPredecessorResponse>, Status> {
        let address = self.state.predecessor_address().unwrap_or_default();
        debug!("get_predecessor -> {address:?}");
        Ok(Response::new(GetPredecessorResponse { address }))
    }

    async fn get_successors(&self, _request: Request<Empty>) -> Result<Response<SuccessorListMsg>, Status> {
        let addresses = self.state.successors.lock().unwrap().as_wire();
        Ok(Response::new(SuccessorListMsg { addresses }))
    }

    async fn notify(&self, request: Request<NotifyRequest>) -> Result<Response<Empty>, Status> {
        let peer = request.into_inner().address;
        debug!("notify from {peer}");
        handle_notify(&self.state, &peer);
        Ok(Response::new(Empty {}))
    }

    async fn find_successor(
        &self,
        request: Request<FindSuccessorRequest>,
    ) -> Result<Response<FindSuccessorResponse>, Status> {
        let bytes: [u8; 20] = request
            .into_inner()
            .id
            .try_into()
            .map_err(|_| Status::invalid_argument("identifier must be 20 bytes"))?;
        let target = Identifier::from_be_bytes(bytes);

        let (address, found) = find_successor_locally(&self.state, target);
        let address = address.unwrap_or_default();
        debug!("find_successor({target:?}) -> address={address} found={found}");
        Ok(Response::new(FindSuccessorResponse { address, found }))
    }

    async fn join(&self, request: Request<JoinRequest>) -> Result<Response<JoinResponse>, Status> {
        let new_node_address = request.into_inner().address;
        info!("join request from {new_node_address}");
        let target = Identifier::hash(&new_node_address);
        let address = crate::routing::find(&self.state, target, self.rpc_timeout)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(JoinResponse { address }))
    }

    async fn put(&self, request: Request<PutRequest>) -> Result<Response<Empty>, Status> {
        let request = request.into_inner();
        self.state.bucket.lock().unwrap().put(request.key, request.value);
        Ok(Response::new(Empty {}))
    }

    async fn get(&self, request: Request<GetRequest>) -> Result<Response<GetResponse>, Status> {
        let key = request.into_inner().key;
        let value = bucket_get(&self.state.bucket, &key)?;
        Ok(Response::new(GetResponse { value }))
    }

    async fn delete(&self, request: Request<DeleteRequest>) -> Result<Response<Empty>, Status> {
        let key = request.into_inner().key;
        self.state
            .bucket
            .lock()
            .unwrap()
            .delete(&key)
            .map_err(Status::from)?;
        Ok(Response::new(Empty {}))
    }
}

fn bucket_get(bucket: &std::sync::Mutex<Bucket>, key: &str) -> Result<String, Status> {
    bucket.lock().unwrap().get(key).map_err(Status::from)
}
