// In-process stand-in for the insign_ffi exports, used by unit tests.
// State is thread-local so parallel tests do not observe each other's calls.
use std::cell::RefCell;
use std::ptr;

use libc::{c_void, size_t};

use crate::binding::{EXPECTED_ABI_VERSION, EntryPoints};

#[derive(Clone, Debug)]
pub struct StubConfig {
    pub abi_version: u32,
    pub status: i32,
    /// `None` makes compile hand back a null output pointer.
    pub output: Option<Vec<u8>>,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            abi_version: EXPECTED_ABI_VERSION,
            status: 0,
            output: Some(b"X".to_vec()),
        }
    }
}

#[derive(Default)]
struct StubState {
    config: Option<StubConfig>,
    compile_calls: usize,
    last_input: Vec<u8>,
    issued: Vec<(usize, usize)>,
    freed: Vec<(usize, usize)>,
}

thread_local! {
    static STATE: RefCell<StubState> = RefCell::new(StubState::default());
}

pub fn install(config: StubConfig) {
    STATE.with(|state| {
        *state.borrow_mut() = StubState {
            config: Some(config),
            ..StubState::default()
        };
    });
}

pub fn entry_points() -> EntryPoints {
    EntryPoints {
        abi_version: stub_abi_version,
        compile: stub_compile,
        free: stub_free,
    }
}

pub fn call_compile(input: &[u8]) -> (*mut u8, usize) {
    let mut out_ptr: *mut u8 = ptr::null_mut();
    let mut out_len: size_t = 0;
    unsafe { stub_compile(input.as_ptr(), input.len(), &mut out_ptr, &mut out_len) };
    (out_ptr, out_len)
}

pub fn compile_calls() -> usize {
    STATE.with(|state| state.borrow().compile_calls)
}

pub fn last_input() -> Vec<u8> {
    STATE.with(|state| state.borrow().last_input.clone())
}

pub fn issued() -> Vec<(usize, usize)> {
    STATE.with(|state| state.borrow().issued.clone())
}

pub fn freed() -> Vec<(usize, usize)> {
    STATE.with(|state| state.borrow().freed.clone())
}

fn config() -> StubConfig {
    STATE.with(|state| state.borrow().config.clone().unwrap_or_default())
}

unsafe extern "C" fn stub_abi_version() -> u32 {
    config().abi_version
}

unsafe extern "C" fn stub_compile(
    input_ptr: *const u8,
    input_len: size_t,
    output_ptr: *mut *mut u8,
    output_len: *mut size_t,
) -> i32 {
    let config = config();
    let input = unsafe { std::slice::from_raw_parts(input_ptr, input_len) }.to_vec();

    let (ptr, len) = match &config.output {
        Some(bytes) => {
            // malloc(0) may legally return null; always ask for at least one byte.
            let ptr = unsafe { libc::malloc(bytes.len().max(1)) } as *mut u8;
            if !ptr.is_null() {
                unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len()) };
            }
            (ptr, bytes.len())
        }
        None => (ptr::null_mut(), 0),
    };

    unsafe {
        *output_ptr = ptr;
        *output_len = len;
    }

    STATE.with(|state| {
        let mut state = state.borrow_mut();
        state.compile_calls += 1;
        state.last_input = input;
        if !ptr.is_null() {
            state.issued.push((ptr as usize, len));
        }
    });
    config.status
}

unsafe extern "C" fn stub_free(ptr: *mut c_void, len: size_t) {
    STATE.with(|state| state.borrow_mut().freed.push((ptr as usize, len)));
    unsafe { libc::free(ptr) };
}
