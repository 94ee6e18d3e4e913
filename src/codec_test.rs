use super::BincodeCodec;
use super::InstanceCodec;
use super::JsonCodec;
use super::ServiceInstance;

fn sample() -> ServiceInstance {
    ServiceInstance::new("web", "10.0.0.5", 8080).with_payload(b"{\"zone\":\"a\"}".to_vec())
}

#[test]
fn json_codec_round_trips() {
    let codec = JsonCodec;
    let bytes = codec.encode(&sample()).expect("encode should succeed");
    let decoded = codec.decode(&bytes).expect("decode should succeed");
    assert_eq!(decoded, sample());
}

#[test]
fn bincode_codec_round_trips() {
    let codec = BincodeCodec;
    let bytes = codec.encode(&sample()).expect("encode should succeed");
    let decoded = codec.decode(&bytes).expect("decode should succeed");
    assert_eq!(decoded, sample());
}

#[test]
fn json_codec_rejects_garbage() {
    let codec = JsonCodec;
    assert!(codec.decode(b"not json at all").is_err());
}

#[test]
fn json_codec_tolerates_missing_payload_field() {
    // Records written by foreign clients may omit the opaque payload.
    let codec = JsonCodec;
    let decoded = codec
        .decode(br#"{"service_name":"web","host_addr":"10.0.0.5","port":8080}"#)
        .expect("decode should succeed");
    assert!(decoded.payload.is_empty());
}
