use pqclip_crypto::{decrypt, encrypt, generate_key, CryptoContext, EncryptedContainer, KdfParams};

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_encrypt(bencher: divan::Bencher, size: usize) {
    let ctx = CryptoContext::new(KdfParams::default());
    let key = generate_key(&ctx).unwrap();
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| encrypt(&ctx, divan::black_box(&key), divan::black_box(&data)).unwrap());
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_decrypt(bencher: divan::Bencher, size: usize) {
    let ctx = CryptoContext::new(KdfParams::default());
    let key = generate_key(&ctx).unwrap();
    let sealed = encrypt(&ctx, &key, &make_data(size)).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            decrypt(
                divan::black_box(&key),
                divan::black_box(&sealed.ciphertext),
                divan::black_box(&sealed.nonce),
            )
            .unwrap()
        });
}

#[divan::bench(args = [65536, 1048576])]
fn bench_container_parse(bencher: divan::Bencher, size: usize) {
    let bytes = EncryptedContainer::new("clip.mp4", vec![0u8; 12], make_data(size))
        .serialize()
        .unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| EncryptedContainer::deserialize(divan::black_box(&bytes)).unwrap());
}

fn main() {
    divan::main();
}
