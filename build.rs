//! Generates the WireGuard gRPC service stubs.
//!
//! The message types are declared by hand in `src/proto.rs`, so only the
//! service plumbing is generated here and no `protoc` is required.

use tonic_build::manual::{Builder, Method, Service};

fn method(name: &str, route: &str, input: &str, output: &str) -> Method {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(format!("crate::proto::{}", input))
        .output_type(format!("crate::proto::{}", output))
        .codec_path("tonic::codec::ProstCodec")
        .build()
}

fn main() {
    let service = Service::builder()
        .name("WireGuard")
        .package("wg")
        .method(method("devices", "Devices", "DevicesRequest", "DevicesResponse"))
        .method(method("device", "Device", "DeviceRequest", "DeviceResponse"))
        .method(method(
            "configure_device",
            "ConfigureDevice",
            "ConfigureDeviceRequest",
            "ConfigureDeviceResponse",
        ))
        .build();

    Builder::new().compile(&[service]);

    println!("cargo:rerun-if-changed=build.rs");
}
