use kernel::trap;
use kernel::{Config, CpuState, ExcType, InterruptLine, Machine, Pid, Transfer};
use types::syscall::{
    SYSCALL_CREATEPROCESS, SYSCALL_ERROR, SYSCALL_GETCPUTIME, SYSCALL_GETPID, SYSCALL_PASSEREN,
    SYSCALL_SPECPASSUP, SYSCALL_TERMINATEPROCESS, SYSCALL_VERHOGEN, SYSCALL_WAITIO,
};
use types::Register;
use vm::{boot, logger, BoardConfig, IoRequest, Nucleus};

const DATA: u32 = Config::RAM_BASE + 0x1000;
const SEM: u32 = Config::RAM_BASE + 0x2000;

/// Boots a board with `count` default-priority processes and runs the first.
fn booted(count: usize) -> (Nucleus, Vec<Pid>) {
    let mut sched = boot(BoardConfig::default());
    let pids: Vec<Pid> = (0..count)
        .map(|i| {
            sched
                .create(0x1000 * (i as u32 + 1), Config::DEFAULT_PRIORITY, true)
                .expect("create")
        })
        .collect();
    assert_eq!(sched.dispatch(), Transfer::Load(pids[0]));
    (sched, pids)
}

fn syscall(sched: &mut Nucleus, sysno: u32, args: [u32; 3]) -> Transfer {
    let state = sched.machine().syscall_state(sysno, args);
    trap::sysbk(sched, state)
}

fn running(sched: &Nucleus) -> CpuState {
    *sched.machine().running().expect("a process should be running")
}

fn a0(sched: &Nucleus) -> u32 {
    running(sched).reg(Register::A0)
}

#[test]
fn getpid_reports_caller_and_parent() {
    let (mut sched, pids) = booted(1);
    let parent = pids[0];
    assert_eq!(syscall(&mut sched, SYSCALL_GETPID, [DATA, DATA + 4, 0]), Transfer::Load(parent));
    assert_eq!(sched.machine().read_word(DATA), parent.to_word());
    assert_eq!(sched.machine().read_word(DATA + 4), 0);
    assert_eq!(running(&sched).pc, 0x1000 + 4);

    let mut child_state = CpuState::cleared();
    child_state.pc = 0x8000;
    sched.machine_mut().store_state(DATA + 0x100, &child_state);
    assert_eq!(
        syscall(&mut sched, SYSCALL_CREATEPROCESS, [DATA + 0x100, 4, DATA + 8]),
        Transfer::Load(parent)
    );
    let child = Pid::from_word(sched.machine().read_word(DATA + 8)).expect("child pid written");

    // Slice expiry hands the CPU to the higher-priority child.
    let state = running(&sched);
    assert_eq!(trap::interrupt(&mut sched, 2, state), Transfer::Load(child));
    assert_eq!(syscall(&mut sched, SYSCALL_GETPID, [0, DATA + 12, 0]), Transfer::Load(child));
    assert_eq!(sched.machine().read_word(DATA + 12), parent.to_word());
    assert_eq!(running(&sched).pc, 0x8000 + 4);
}

#[test]
fn create_process_builds_child_from_guest_state() {
    let (mut sched, pids) = booted(1);
    let mut child_state = CpuState::cleared();
    child_state.pc = 0x9000;
    sched.machine_mut().store_state(DATA, &child_state);

    assert_eq!(syscall(&mut sched, SYSCALL_CREATEPROCESS, [DATA, 3, DATA + 0x100]), Transfer::Load(pids[0]));
    assert_eq!(a0(&sched), 0);
    let child = Pid::from_word(sched.machine().read_word(DATA + 0x100)).unwrap();
    assert_eq!(sched.pool().parent(child), Some(pids[0]));
    assert_eq!(sched.priority(child), 3);
    assert_eq!(sched.pool().get(child).state.pc, 0x9000);
    assert_eq!(sched.ready_len(), 1);
}

#[test]
fn create_process_fails_when_pool_is_empty() {
    let (mut sched, _) = booted(Config::MAX_PROC);
    assert_eq!(sched.pool().free_count(), 0);
    sched.machine_mut().store_state(DATA, &CpuState::cleared());

    let _ = syscall(&mut sched, SYSCALL_CREATEPROCESS, [DATA, 1, DATA + 0x100]);
    assert_eq!(a0(&sched), SYSCALL_ERROR);
    assert_eq!(sched.machine().read_word(DATA + 0x100), 0);
}

#[test]
fn terminate_self_runs_next_process() {
    let (mut sched, pids) = booted(2);
    assert_eq!(syscall(&mut sched, SYSCALL_TERMINATEPROCESS, [0, 0, 0]), Transfer::Load(pids[1]));
    assert!(!sched.pool().is_live(pids[0]));

    assert_eq!(syscall(&mut sched, SYSCALL_TERMINATEPROCESS, [0, 0, 0]), Transfer::Halt);
    assert!(sched.machine().halted());
}

#[test]
fn terminate_other_and_unknown_pid() {
    let (mut sched, pids) = booted(2);
    let victim = pids[1].to_word();

    assert_eq!(syscall(&mut sched, SYSCALL_TERMINATEPROCESS, [victim, 0, 0]), Transfer::Load(pids[0]));
    assert_eq!(a0(&sched), 0);
    assert!(!sched.pool().is_live(pids[1]));

    assert_eq!(syscall(&mut sched, SYSCALL_TERMINATEPROCESS, [victim, 0, 0]), Transfer::Load(pids[0]));
    assert_eq!(a0(&sched), SYSCALL_ERROR);
    let _ = syscall(&mut sched, SYSCALL_TERMINATEPROCESS, [999, 0, 0]);
    assert_eq!(a0(&sched), SYSCALL_ERROR);
    assert_eq!(sched.current(), Some(pids[0]));
}

#[test]
fn semaphore_syscalls_block_and_wake() {
    let (mut sched, pids) = booted(2);
    let (a, b) = (pids[0], pids[1]);

    assert_eq!(syscall(&mut sched, SYSCALL_PASSEREN, [SEM, 0, 0]), Transfer::Load(b));
    assert!(sched.asl().head_blocked(kernel::SemKey(SEM)).is_some());
    // a resumes past its P once woken
    assert_eq!(sched.pool().get(a).state.pc, 0x1000 + 4);

    assert_eq!(syscall(&mut sched, SYSCALL_VERHOGEN, [SEM, 0, 0]), Transfer::Load(b));
    assert_eq!(sched.current(), Some(b));
    assert_eq!(sched.ready().head(), Some(a));
    assert_eq!(sched.machine().read_word(SEM), 0);

    assert_eq!(syscall(&mut sched, SYSCALL_VERHOGEN, [SEM, 0, 0]), Transfer::Load(b));
    assert_eq!(sched.machine().read_word(SEM), 1);
    assert_eq!(syscall(&mut sched, SYSCALL_PASSEREN, [SEM, 0, 0]), Transfer::Load(b));
    assert_eq!(sched.machine().read_word(SEM), 0);
}

#[test]
fn waitio_returns_device_status() {
    let (mut sched, pids) = booted(1);
    sched.machine_mut().set_device_status(0x55);

    assert_eq!(syscall(&mut sched, SYSCALL_WAITIO, [2, 0x1000_0250, 1]), Transfer::Load(pids[0]));
    assert_eq!(a0(&sched), 0x55);
    assert_eq!(
        sched.machine().io_log(),
        &[IoRequest {
            command: 2,
            device: 0x1000_0250,
            subdevice: 1,
        }]
    );
}

#[test]
fn device_wait_is_billed_as_kernel_time() {
    let (mut sched, pids) = booted(1);
    sched.machine_mut().set_io_latency(500);
    sched.machine_mut().advance(200);

    assert_eq!(syscall(&mut sched, SYSCALL_WAITIO, [2, 0x1000_0250, 0]), Transfer::Load(pids[0]));
    let times = sched.cpu_times(pids[0]);
    assert_eq!(times.user, 200);
    assert_eq!(times.kernel, 500);
    // The slice does not shrink while the handler waits.
    assert_eq!(sched.machine().interval_timer(), Config::TIME_SLICE_US - 200);

    assert_eq!(syscall(&mut sched, SYSCALL_GETCPUTIME, [DATA, DATA + 4, DATA + 8]), Transfer::Load(pids[0]));
    assert_eq!(sched.machine().read_word(DATA), 200);
    assert_eq!(sched.machine().read_word(DATA + 4), 500);
    assert_eq!(sched.machine().read_word(DATA + 8), 700);
}

#[test]
fn getcputime_reports_elapsed_ticks() {
    let (mut sched, pids) = booted(1);
    sched.machine_mut().advance(250);

    assert_eq!(syscall(&mut sched, SYSCALL_GETCPUTIME, [DATA, DATA + 4, DATA + 8]), Transfer::Load(pids[0]));
    assert_eq!(sched.machine().read_word(DATA), 250);
    assert_eq!(sched.machine().read_word(DATA + 4), 0);
    assert_eq!(sched.machine().read_word(DATA + 8), 250);
    // The rest of the slice is handed back.
    assert_eq!(sched.machine().interval_timer(), Config::TIME_SLICE_US - 250);
}

#[test]
fn specpassup_twice_terminates_the_caller() {
    let (mut sched, pids) = booted(2);
    let args = [ExcType::Sysbk as u32, DATA, DATA + 0x100];

    assert_eq!(syscall(&mut sched, SYSCALL_SPECPASSUP, args), Transfer::Load(pids[0]));
    assert_eq!(a0(&sched), 0);
    assert_eq!(syscall(&mut sched, SYSCALL_SPECPASSUP, args), Transfer::Load(pids[1]));
    assert!(!sched.pool().is_live(pids[0]));
}

#[test]
fn specpassup_with_bad_type_terminates_the_caller() {
    let (mut sched, pids) = booted(1);
    assert_eq!(syscall(&mut sched, SYSCALL_SPECPASSUP, [7, DATA, DATA + 0x100]), Transfer::Halt);
    assert!(!sched.pool().is_live(pids[0]));
    assert!(logger::records().iter().any(|r| r.contains("invalid exception type 7")));
}

#[test]
fn unknown_syscall_goes_to_sysbk_handler() {
    let (mut sched, pids) = booted(1);
    let mut handler = CpuState::cleared();
    handler.pc = 0x7000;
    sched.machine_mut().store_state(DATA + 0x100, &handler);
    let _ = syscall(&mut sched, SYSCALL_SPECPASSUP, [ExcType::Sysbk as u32, DATA, DATA + 0x100]);

    assert_eq!(syscall(&mut sched, 42, [1, 2, 3]), Transfer::Handler(pids[0], ExcType::Sysbk));
    let saved = sched.machine().fetch_state(DATA);
    assert_eq!(saved.sysno(), 42);
    assert_eq!(saved.pc, 0x1000 + 8);
    assert_eq!(running(&sched).pc, 0x7000);
}

#[test]
fn unknown_syscall_without_handler_terminates() {
    let (mut sched, pids) = booted(2);
    assert_eq!(syscall(&mut sched, 42, [0, 0, 0]), Transfer::Load(pids[1]));
    assert!(!sched.pool().is_live(pids[0]));
}

#[test]
fn program_trap_and_tlb_pass_up() {
    let (mut sched, pids) = booted(2);
    let mut handler = CpuState::cleared();
    handler.pc = 0x7400;
    sched.machine_mut().store_state(DATA + 0x100, &handler);
    let _ = syscall(&mut sched, SYSCALL_SPECPASSUP, [ExcType::Trap as u32, DATA, DATA + 0x100]);

    let state = running(&sched);
    assert_eq!(trap::program_trap(&mut sched, state), Transfer::Handler(pids[0], ExcType::Trap));
    let state = running(&sched);
    assert_eq!(trap::tlb(&mut sched, state), Transfer::Load(pids[1]));
    assert!(!sched.pool().is_live(pids[0]));
}

#[test]
fn device_interrupt_is_acknowledged_and_resumes() {
    let (mut sched, pids) = booted(1);
    sched.machine_mut().advance(1000);
    let state = running(&sched);

    assert_eq!(trap::interrupt(&mut sched, 7, state), Transfer::Load(pids[0]));
    assert_eq!(sched.machine().acknowledged(), &[InterruptLine::Terminal]);
    assert_eq!(sched.machine().interval_timer(), Config::TIME_SLICE_US - 1000);
    assert_eq!(sched.cpu_times(pids[0]).user, 1000);
}

#[test]
fn interval_timer_rotates_equal_priorities() {
    let (mut sched, pids) = booted(3);
    for expected in [pids[1], pids[2], pids[0], pids[1]] {
        sched.machine_mut().advance(Config::TIME_SLICE_US);
        let state = running(&sched);
        assert_eq!(trap::interrupt(&mut sched, 2, state), Transfer::Load(expected));
    }
}

#[test]
#[should_panic(expected = "kernel panic")]
fn unknown_interrupt_line_is_fatal() {
    let (mut sched, _) = booted(1);
    let state = running(&sched);
    let _ = trap::interrupt(&mut sched, 9, state);
}
