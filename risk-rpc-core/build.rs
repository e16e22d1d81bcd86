fn main() {
    // 消息体在 src/risk/mod.rs 中手写（prost），这里只生成 gRPC 客户端与服务端骨架，
    // 因此构建时不依赖 protoc
    let risk_service = tonic_build::manual::Service::builder()
        .name("RiskService")
        .package("risk")
        .method(
            tonic_build::manual::Method::builder()
                .name("check_address")
                .route_name("CheckAddress")
                .input_type("crate::risk::RiskRequest")
                .output_type("crate::risk::RiskResponse")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .build();

    tonic_build::manual::Builder::new().compile(&[risk_service]);

    println!("cargo:rerun-if-changed=build.rs");
}
