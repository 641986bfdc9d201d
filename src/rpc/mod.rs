pub mod client;
pub mod service;

pub mod chord_proto {
    tonic::include_proto!("chord");
}

/// Encoded `FileDescriptorSet` for the `chord` service, used to register
/// server reflection so the running endpoint is discoverable via `grpcurl`.
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("chord_descriptor");
