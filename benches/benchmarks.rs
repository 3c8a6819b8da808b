//! Performance benchmarks for wg-control
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::{Duration, SystemTime};
use wg_control::control::adapter;
use wg_control::proto;
use wg_control::wireguard::{apply_config, Device, IpNet, KeyPair, Peer, PrivateKey};

fn sample_device(peers: usize) -> Device {
    let keys = KeyPair::generate();
    Device {
        name: "wg0".to_string(),
        private_key: Some(keys.private),
        public_key: Some(keys.public),
        listen_port: 51820,
        peers: (0..peers)
            .map(|i| {
                let mut peer = Peer::new(KeyPair::generate().public);
                peer.endpoint = Some(format!("192.0.2.{}:51820", i % 250 + 1).parse().unwrap());
                peer.persistent_keepalive_interval = Some(Duration::from_secs(25));
                peer.last_handshake_time = Some(SystemTime::now());
                peer.allowed_ips = vec![IpNet::from_cidr(&format!("10.{}.{}.0/24", i / 256, i % 256)).unwrap()];
                peer
            })
            .collect(),
        ..Default::default()
    }
}

fn sample_wire_config(peers: usize) -> proto::Config {
    proto::Config {
        private_key: Some(PrivateKey::generate().as_bytes().to_vec()),
        listen_port: Some(51820),
        replace_peers: true,
        peers: (0..peers)
            .map(|i| proto::PeerConfig {
                public_key: KeyPair::generate().public.as_bytes().to_vec(),
                endpoint: Some(proto::UdpAddr {
                    ip: vec![192, 0, 2, (i % 250 + 1) as u8],
                    port: 51820,
                    zone: String::new(),
                }),
                persistent_keepalive_interval: Some(prost_types::Duration {
                    seconds: 25,
                    nanos: 0,
                }),
                allowed_ips: vec![proto::IpNet {
                    ip: vec![10, (i / 256) as u8, (i % 256) as u8, 0],
                    ip_mask: vec![255, 255, 255, 0],
                }],
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

fn bench_keys(c: &mut Criterion) {
    let mut group = c.benchmark_group("keys");

    group.bench_function("generate", |b| {
        b.iter(PrivateKey::generate);
    });

    let private_key = PrivateKey::generate();
    group.bench_function("public_key", |b| {
        b.iter(|| black_box(&private_key).public_key());
    });

    group.finish();
}

fn bench_adapter(c: &mut Criterion) {
    let mut group = c.benchmark_group("adapter");

    for peers in [1, 16, 256] {
        let device = sample_device(peers);
        group.bench_with_input(BenchmarkId::new("device_to_wire", peers), &device, |b, d| {
            b.iter(|| adapter::device_to_wire(black_box(d)).unwrap());
        });

        let config = sample_wire_config(peers);
        group.bench_with_input(BenchmarkId::new("config_from_wire", peers), &config, |b, c| {
            b.iter(|| adapter::config_from_wire(black_box(c)).unwrap());
        });
    }

    group.finish();
}

fn bench_apply_config(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_config");

    for peers in [16, 256] {
        let device = sample_device(peers);
        let config = adapter::config_from_wire(&sample_wire_config(peers)).unwrap();
        group.bench_with_input(
            BenchmarkId::new("replace_peers", peers),
            &(device, config),
            |b, (d, c)| {
                b.iter(|| apply_config(black_box(d), black_box(c)).unwrap());
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_keys, bench_adapter, bench_apply_config);
criterion_main!(benches);
