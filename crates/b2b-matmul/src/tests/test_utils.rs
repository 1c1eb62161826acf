use cubecl::{prelude::*, server::Handle};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::components::MatmulElem;

pub(crate) type TestRuntime = cubecl::wgpu::WgpuRuntime;
pub(crate) type TestClient =
    ComputeClient<<TestRuntime as Runtime>::Server>;

pub(crate) fn test_client() -> TestClient {
    TestRuntime::client(&Default::default())
}

pub(crate) fn create<E: MatmulElem>(client: &TestClient, data: &[E]) -> Handle {
    client.create(E::as_bytes(data))
}

pub(crate) fn read<E: MatmulElem>(client: &TestClient, handle: &Handle) -> Vec<E> {
    let bytes = client.read_one(handle.clone().binding());
    E::from_bytes(&bytes).to_vec()
}

/// Uniform values in `[-1, 1)`, rounded to `E`, with a fixed seed.
pub(crate) fn sample<E: MatmulElem>(len: usize, seed: u64) -> Vec<E> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| E::narrow(rng.random_range(-1.0..1.0)))
        .collect()
}

/// Compares each value against its expectation, allowing a relative error of `epsilon` on
/// values larger than one.
pub(crate) fn assert_equals_approx<E: MatmulElem>(
    actual: &[E],
    expected: &[f32],
    epsilon: f32,
) -> Result<(), String> {
    if actual.len() != expected.len() {
        return Err(format!(
            "Lengths differ: actual={}, expected={}",
            actual.len(),
            expected.len()
        ));
    }

    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        let a = a.widen();
        let allowed_error = epsilon * e.abs().max(1.0);

        if !((a - e).abs() <= allowed_error) {
            return Err(format!(
                "Values differ more than epsilon: index={i} actual={a}, expected={e}, difference={}, epsilon={allowed_error}",
                (a - e).abs(),
            ));
        }
    }

    Ok(())
}
