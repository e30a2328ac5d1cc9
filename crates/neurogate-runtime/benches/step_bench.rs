use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use neurogate_runtime::{
    codec, ActivationFunction, Command, NeuronType, RunParams, Runtime, SynapseType,
};

fn build_runtime(neurons: u32, fully_connected: bool) -> Runtime {
    let mut runtime = Runtime::default();
    runtime.init().expect("bench runtime init");

    for id in 0..neurons {
        runtime.execute(&Command::create_neuron(
            id,
            NeuronType::Excitatory,
            ActivationFunction::Sigmoid,
        ));
    }

    let mut synapse_id = 0;
    let mut wire = |runtime: &mut Runtime, pre: u32, post: u32| {
        runtime.execute(&Command::connect_neurons(pre, post));
        runtime.execute(&Command::create_synapse(synapse_id, pre, post, SynapseType::Excitatory));
        synapse_id += 1;
    };

    if fully_connected {
        for pre in 0..neurons {
            for post in (0..neurons).filter(|&post| post != pre) {
                wire(&mut runtime, pre, post);
            }
        }
    } else {
        // Simple chain
        for pre in 1..neurons {
            wire(&mut runtime, pre - 1, pre);
        }
    }
    runtime
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("runtime_step");
    let params = RunParams::new(1.0, 20).expect("bench params");

    for &n in &[8u32, 32u32, 128u32] {
        group.throughput(Throughput::Elements(u64::from(n)));
        group.bench_with_input(BenchmarkId::new("chain", n), &n, |b, &n| {
            b.iter_batched(
                || build_runtime(n, false),
                |mut runtime| {
                    let inputs = vec![10.0; n as usize];
                    for _ in 0..params.num_steps {
                        runtime.step_with_inputs(&inputs, params.time_step).unwrap();
                    }
                },
                BatchSize::SmallInput,
            );
        });

        // Fully connected only for small sizes; edge count is quadratic
        if n <= 32 {
            group.bench_with_input(BenchmarkId::new("fully_connected", n), &n, |b, &n| {
                b.iter_batched(
                    || build_runtime(n, true),
                    |mut runtime| {
                        let _summary = runtime.run(params).unwrap();
                    },
                    BatchSize::SmallInput,
                );
            });
        }
    }

    group.finish();
}

fn bench_frames(c: &mut Criterion) {
    let mut runtime = build_runtime(16, false);
    let frame = codec::encode_command(&Command::get_neuron_state(8));

    c.bench_function("process_frame_get_state", |b| {
        b.iter(|| runtime.process_frame(&frame).unwrap())
    });
}

criterion_group!(benches, bench_step, bench_frames);
criterion_main!(benches);
