//! Execution request and result types.
//!
//! [`Message`] is a borrowed Rust view of `vmlink_message`.
//! [`ExecutionResult`] owns a `vmlink_result` and releases its output
//! exactly once when dropped.

use core::fmt;
use core::mem::ManuallyDrop;
use core::ptr;
use core::slice;

use crate::error::MessageError;
use crate::ffi::{vmlink_message, vmlink_result};
use crate::status::StatusCode;
use crate::types::{Address, CallKind, ZERO_ADDRESS};

/// Read-only transaction and block environment.
pub type TxContext = crate::ffi::vmlink_tx_context;

/// One execution request. The input buffer is borrowed, never owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a> {
    pub kind: CallKind,
    /// Call-stack depth; 0 for a call originating from a transaction.
    pub depth: i32,
    pub gas: i64,
    /// The account whose state the execution modifies.
    pub recipient: Address,
    pub sender: Address,
    /// Carried through unchanged; its role relative to `sender` is not
    /// interpreted by this crate.
    pub sender_template: Address,
    pub input: &'a [u8],
    pub value: u64,
}

impl<'a> Message<'a> {
    /// A depth-0 call with no value and no sender template.
    pub fn call(sender: Address, recipient: Address, gas: i64, input: &'a [u8]) -> Self {
        Self {
            kind: CallKind::Call,
            depth: 0,
            gas,
            recipient,
            sender,
            sender_template: ZERO_ADDRESS,
            input,
            value: 0,
        }
    }

    pub fn with_value(mut self, value: u64) -> Self {
        self.value = value;
        self
    }

    pub fn with_depth(mut self, depth: i32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_sender_template(mut self, template: Address) -> Self {
        self.sender_template = template;
        self
    }

    /// The C layout of this message. The returned struct borrows `self.input`.
    pub fn to_raw(&self) -> vmlink_message {
        let (input_data, input_size) = if self.input.is_empty() {
            (ptr::null(), 0)
        } else {
            (self.input.as_ptr(), self.input.len())
        };
        vmlink_message {
            kind: self.kind.as_i32(),
            depth: self.depth,
            gas: self.gas,
            recipient: self.recipient,
            sender: self.sender,
            sender_template: self.sender_template,
            input_data,
            input_size,
            value: self.value,
        }
    }

    /// View a raw message.
    ///
    /// # Safety
    /// If `raw.input_data` is non-null it must point to `raw.input_size`
    /// readable bytes that outlive `'a`.
    pub unsafe fn from_raw(raw: &'a vmlink_message) -> Result<Self, MessageError> {
        let kind = CallKind::from_i32(raw.kind).ok_or(MessageError::InvalidCallKind(raw.kind))?;
        let input: &'a [u8] = if raw.input_data.is_null() {
            if raw.input_size != 0 {
                return Err(MessageError::NullInput(raw.input_size));
            }
            &[]
        } else if raw.input_size == 0 {
            &[]
        } else {
            slice::from_raw_parts(raw.input_data, raw.input_size)
        };
        Ok(Self {
            kind,
            depth: raw.depth,
            gas: raw.gas,
            recipient: raw.recipient,
            sender: raw.sender,
            sender_template: raw.sender_template,
            input,
            value: raw.value,
        })
    }
}

// ── ExecutionResult ──

/// The owned result of one execution.
///
/// If a release function is attached, dropping the result calls it exactly
/// once; the output must not be touched afterwards, which ownership enforces.
/// Without a release function the output is borrowed static memory.
pub struct ExecutionResult {
    raw: vmlink_result,
}

impl ExecutionResult {
    /// Build a result holding a private copy of `output`.
    ///
    /// `gas_left` is forced to 0 unless `status_code` is success or revert.
    /// If the copy cannot be allocated the result is `OutOfMemory` with all
    /// other fields zeroed.
    pub fn new(status_code: StatusCode, gas_left: i64, output: &[u8]) -> Self {
        if output.is_empty() {
            return Self::with_output(status_code, gas_left, Vec::new());
        }
        let mut buffer = Vec::new();
        if buffer.try_reserve_exact(output.len()).is_err() {
            return Self::out_of_memory();
        }
        buffer.extend_from_slice(output);
        Self::with_output(status_code, gas_left, buffer)
    }

    /// Build a result that takes ownership of `output` without copying.
    pub fn with_output(status_code: StatusCode, gas_left: i64, output: Vec<u8>) -> Self {
        let gas_left = if status_code.retains_gas() { gas_left } else { 0 };
        if output.is_empty() {
            return Self {
                raw: vmlink_result {
                    status_code: status_code.as_i32(),
                    gas_left,
                    output_data: ptr::null(),
                    output_size: 0,
                    release: None,
                },
            };
        }
        let boxed = output.into_boxed_slice();
        let output_size = boxed.len();
        let output_data = Box::into_raw(boxed) as *const u8;
        Self {
            raw: vmlink_result {
                status_code: status_code.as_i32(),
                gas_left,
                output_data,
                output_size,
                release: Some(release_boxed_output),
            },
        }
    }

    /// Build a result whose output is static memory. Nothing is released.
    pub fn from_static(status_code: StatusCode, gas_left: i64, output: &'static [u8]) -> Self {
        let gas_left = if status_code.retains_gas() { gas_left } else { 0 };
        Self {
            raw: vmlink_result {
                status_code: status_code.as_i32(),
                gas_left,
                output_data: if output.is_empty() { ptr::null() } else { output.as_ptr() },
                output_size: output.len(),
                release: None,
            },
        }
    }

    /// Build a result with a custom deallocation strategy.
    ///
    /// # Safety
    /// `output_data` must point to `output_size` bytes that stay valid until
    /// `release` is called with this result, and `release` must free exactly
    /// those resources.
    pub unsafe fn from_parts(
        status_code: StatusCode,
        gas_left: i64,
        output_data: *const u8,
        output_size: usize,
        release: Option<crate::ffi::vmlink_release_result_fn>,
    ) -> Self {
        let gas_left = if status_code.retains_gas() { gas_left } else { 0 };
        Self {
            raw: vmlink_result {
                status_code: status_code.as_i32(),
                gas_left,
                output_data,
                output_size,
                release,
            },
        }
    }

    pub fn success(gas_left: i64, output: &[u8]) -> Self {
        Self::new(StatusCode::Success, gas_left, output)
    }

    pub fn revert(gas_left: i64, output: &[u8]) -> Self {
        Self::new(StatusCode::Revert, gas_left, output)
    }

    pub fn failure() -> Self {
        Self::new(StatusCode::Failure, 0, &[])
    }

    /// An output-less result with the given status and zero gas.
    pub fn error(status_code: StatusCode) -> Self {
        Self::new(status_code, 0, &[])
    }

    /// The allocation-failure result: `OutOfMemory`, everything else zeroed.
    pub fn out_of_memory() -> Self {
        Self {
            raw: vmlink_result {
                status_code: StatusCode::OutOfMemory.as_i32(),
                gas_left: 0,
                output_data: ptr::null(),
                output_size: 0,
                release: None,
            },
        }
    }

    /// Adopt a result produced across the boundary.
    ///
    /// # Safety
    /// `raw` must be a live result not yet released, and nothing else may
    /// release it.
    pub unsafe fn from_raw(raw: vmlink_result) -> Self {
        Self { raw }
    }

    /// Hand the result across the boundary. The receiver becomes responsible
    /// for calling the release function.
    pub fn into_raw(self) -> vmlink_result {
        let this = ManuallyDrop::new(self);
        this.raw
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_raw_lossy(self.raw.status_code)
    }

    /// The status code exactly as reported, including undefined values.
    pub fn raw_status_code(&self) -> i32 {
        self.raw.status_code
    }

    pub fn gas_left(&self) -> i64 {
        self.raw.gas_left
    }

    pub fn output(&self) -> &[u8] {
        if self.raw.output_data.is_null() || self.raw.output_size == 0 {
            return &[];
        }
        // SAFETY: the producer guarantees the buffer is valid until release,
        // and release only happens when `self` is dropped.
        unsafe { slice::from_raw_parts(self.raw.output_data, self.raw.output_size) }
    }

    /// Returns true if dropping this result will call a release function.
    pub fn has_release(&self) -> bool {
        self.raw.release.is_some()
    }

    /// Release the result now. Equivalent to dropping it.
    pub fn release(self) {
        drop(self)
    }
}

impl Drop for ExecutionResult {
    fn drop(&mut self) {
        if let Some(release) = self.raw.release.take() {
            // SAFETY: `release` was attached by the producer of this result and
            // `take()` guarantees it runs once.
            unsafe { release(&self.raw) };
        }
    }
}

impl fmt::Debug for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionResult")
            .field("status_code", &self.raw.status_code)
            .field("gas_left", &self.raw.gas_left)
            .field("output_size", &self.raw.output_size)
            .field("has_release", &self.has_release())
            .finish()
    }
}

// SAFETY: the result exclusively owns its output buffer.
unsafe impl Send for ExecutionResult {}

/// Frees an output buffer allocated by [`ExecutionResult::with_output`].
unsafe extern "C" fn release_boxed_output(result: *const vmlink_result) {
    if result.is_null() {
        return;
    }
    let raw = &*result;
    if !raw.output_data.is_null() && raw.output_size > 0 {
        let slice = ptr::slice_from_raw_parts_mut(raw.output_data as *mut u8, raw.output_size);
        drop(Box::from_raw(slice));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_new_copies_output() {
        let mut source = vec![1u8, 2, 3];
        let result = ExecutionResult::success(42, &source);
        source[0] = 9;
        assert_eq!(result.output(), &[1, 2, 3]);
        assert_ne!(result.output().as_ptr(), source.as_ptr());
        assert!(result.has_release());
        assert_eq!(result.gas_left(), 42);
        assert_eq!(result.status_code(), StatusCode::Success);
    }

    #[test]
    fn test_empty_output_has_no_release() {
        let result = ExecutionResult::success(10, &[]);
        assert!(!result.has_release());
        assert!(result.output().is_empty());
    }

    #[test]
    fn test_gas_zeroed_for_failures() {
        assert_eq!(ExecutionResult::new(StatusCode::OutOfGas, 100, &[]).gas_left(), 0);
        assert_eq!(ExecutionResult::new(StatusCode::Failure, 5, b"x").gas_left(), 0);
        assert_eq!(ExecutionResult::new(StatusCode::Rejected, 5, &[]).gas_left(), 0);
        assert_eq!(ExecutionResult::revert(7, b"why").gas_left(), 7);
    }

    #[test]
    fn test_out_of_memory_is_zeroed() {
        let result = ExecutionResult::out_of_memory();
        assert_eq!(result.status_code(), StatusCode::OutOfMemory);
        assert_eq!(result.gas_left(), 0);
        assert!(result.output().is_empty());
        assert!(!result.has_release());
    }

    #[test]
    fn test_from_static_is_not_released() {
        static OUT: &[u8] = b"static";
        let result = ExecutionResult::from_static(StatusCode::Success, 1, OUT);
        assert!(!result.has_release());
        assert_eq!(result.output(), b"static");
    }

    static RELEASES: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn counting_release(_result: *const vmlink_result) {
        RELEASES.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_custom_release_runs_exactly_once() {
        static DATA: [u8; 4] = [1, 2, 3, 4];
        let before = RELEASES.load(Ordering::SeqCst);
        let result = unsafe {
            ExecutionResult::from_parts(
                StatusCode::Success,
                3,
                DATA.as_ptr(),
                DATA.len(),
                Some(counting_release),
            )
        };
        assert_eq!(result.output(), &DATA);

        // Crossing the boundary and back must not release.
        let raw = result.into_raw();
        assert_eq!(RELEASES.load(Ordering::SeqCst), before);
        let adopted = unsafe { ExecutionResult::from_raw(raw) };
        adopted.release();
        assert_eq!(RELEASES.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn test_raw_roundtrip_keeps_output() {
        let result = ExecutionResult::revert(9, b"revert data");
        let raw = result.into_raw();
        assert_eq!(raw.status_code, StatusCode::Revert as i32);
        assert_eq!(raw.output_size, 11);
        let back = unsafe { ExecutionResult::from_raw(raw) };
        assert_eq!(back.output(), b"revert data");
    }

    #[test]
    fn test_unknown_status_kept_raw() {
        let raw = vmlink_result {
            status_code: -77,
            gas_left: 0,
            output_data: ptr::null(),
            output_size: 0,
            release: None,
        };
        let result = unsafe { ExecutionResult::from_raw(raw) };
        assert_eq!(result.raw_status_code(), -77);
        assert_eq!(result.status_code(), StatusCode::InternalError);
    }

    #[test]
    fn test_message_raw_roundtrip() {
        let input = b"hello".to_vec();
        let msg = Message::call(Address::new([1; 24]), Address::new([2; 24]), 1000, &input)
            .with_value(5)
            .with_depth(2);
        let raw = msg.to_raw();
        assert_eq!(raw.input_size, 5);
        let back = unsafe { Message::from_raw(&raw) }.unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_message_empty_input_is_null() {
        let msg = Message::call(ZERO_ADDRESS, ZERO_ADDRESS, 0, &[]);
        let raw = msg.to_raw();
        assert!(raw.input_data.is_null());
        assert_eq!(raw.input_size, 0);
    }

    #[test]
    fn test_message_rejects_null_input_with_size() {
        let mut raw = Message::call(ZERO_ADDRESS, ZERO_ADDRESS, 0, &[]).to_raw();
        raw.input_size = 3;
        assert_eq!(
            unsafe { Message::from_raw(&raw) },
            Err(MessageError::NullInput(3))
        );
    }

    #[test]
    fn test_message_rejects_unknown_kind() {
        let mut raw = Message::call(ZERO_ADDRESS, ZERO_ADDRESS, 0, &[]).to_raw();
        raw.kind = 9;
        assert_eq!(
            unsafe { Message::from_raw(&raw) },
            Err(MessageError::InvalidCallKind(9))
        );
    }
}
