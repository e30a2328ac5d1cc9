use neurogate_runtime::{
    codec::{decode_result, encode_command, encode_result, COMMAND_FRAME_LEN},
    ActivationFunction, Command, CommandKind, CommandResult, NeuronType, Runtime, RuntimeError,
    SynapseType, STATUS_ERROR,
};

fn frame_runtime() -> Runtime {
    let mut runtime = Runtime::default();
    runtime.init().unwrap();
    runtime
}

fn send(runtime: &mut Runtime, command: &Command) -> CommandResult {
    let reply = runtime.process_frame(&encode_command(command)).unwrap();
    decode_result(&reply).unwrap()
}

#[test]
fn commands_over_frames_build_a_network() {
    let mut runtime = frame_runtime();

    let created = send(
        &mut runtime,
        &Command::create_neuron(1, NeuronType::Excitatory, ActivationFunction::Linear),
    );
    assert_eq!(created, CommandResult::with_id(1));
    send(
        &mut runtime,
        &Command::create_neuron(2, NeuronType::Inhibitory, ActivationFunction::Relu),
    );
    assert!(send(&mut runtime, &Command::connect_neurons(1, 2)).is_ok());
    let synapse = send(
        &mut runtime,
        &Command::create_synapse(9, 1, 2, SynapseType::Inhibitory).with_weight(0.0),
    );
    assert_eq!(synapse.id, 9);

    let state = send(&mut runtime, &Command::get_neuron_state(2));
    assert_eq!(state, CommandResult::with_value(2, -70.0));

    let run = send(&mut runtime, &Command::run_simulation(0.5, 4));
    assert_eq!(run.value, 2.0);

    let stats = send(&mut runtime, &Command::new(CommandKind::GetMemoryStats));
    assert_eq!(stats.value as usize, runtime.memory_stats().used_bytes);
}

#[test]
fn failed_command_yields_error_frame() {
    let mut runtime = frame_runtime();
    let reply = send(&mut runtime, &Command::get_neuron_state(42));
    assert_eq!(reply.status, STATUS_ERROR);
    assert_eq!(reply.id, 0);
}

#[test]
fn damaged_frames_are_rejected() {
    let mut runtime = frame_runtime();
    let mut frame = encode_command(&Command::new(CommandKind::Noop));
    frame[COMMAND_FRAME_LEN - 1] ^= 0xFF;
    assert!(matches!(
        runtime.process_frame(&frame),
        Err(RuntimeError::ChecksumMismatch { .. })
    ));
    assert!(matches!(
        runtime.process_frame(&frame[..10]),
        Err(RuntimeError::InvalidFrame { .. })
    ));
    assert!(runtime.process_frame(&encode_result(&CommandResult::ok())).is_err());
}

#[test]
fn frames_need_a_running_runtime() {
    let mut runtime = Runtime::default();
    let frame = encode_command(&Command::new(CommandKind::Noop));
    assert_eq!(
        runtime.process_frame(&frame),
        Err(RuntimeError::NotInitialized)
    );

    runtime.init().unwrap();
    let reply = send(&mut runtime, &Command::new(CommandKind::Shutdown));
    assert!(reply.is_ok());
    assert_eq!(runtime.process_frame(&frame), Err(RuntimeError::NotRunning));
}
