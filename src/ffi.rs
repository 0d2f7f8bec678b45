//! FFI bindings for Synheart Stress
//!
//! This module provides C-compatible functions for calling the stress engine from
//! other languages. All functions use C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using `stress_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::DEFAULT_BASELINE_FREQUENCY_HZ;
use crate::engine::StressEngine;
use crate::pipeline::samples_to_stress;
use crate::schema::SampleAdapter;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Process one chunk (JSON array of samples) with a fresh engine and return
/// the result envelope JSON.
///
/// # Safety
/// - `samples_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `stress_free_string`.
/// - Returns NULL on error; call `stress_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn stress_samples_to_result(
    samples_json: *const c_char,
    sampling_hz: u32,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(samples_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    match samples_to_stress(json_str, sampling_hz) {
        Ok(payload) => string_to_cstr(&payload),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Engine API
// ============================================================================

/// Opaque handle to a StressEngine
pub struct StressEngineHandle {
    engine: StressEngine,
}

/// Create a new engine for one session.
///
/// `freq_hz <= 0` selects the default frequency (12, i.e. a 50-row baseline).
///
/// # Safety
/// - Returns a pointer to a newly allocated engine.
/// - Must be freed with `stress_engine_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn stress_engine_new(freq_hz: i32) -> *mut StressEngineHandle {
    clear_last_error();

    let freq = if freq_hz <= 0 {
        DEFAULT_BASELINE_FREQUENCY_HZ
    } else {
        freq_hz as u32
    };

    match StressEngine::with_frequency(freq) {
        Ok(engine) => Box::into_raw(Box::new(StressEngineHandle { engine })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `stress_engine_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn stress_engine_free(engine: *mut StressEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Reset an engine to its empty state. Call at the start of every session.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `stress_engine_new`.
/// - Returns 0 on success, -1 on a null pointer.
#[no_mangle]
pub unsafe extern "C" fn stress_engine_reset(engine: *mut StressEngineHandle) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    (*engine).engine.reset();
    0
}

/// Process one chunk (JSON array of samples) and return the result JSON.
///
/// An empty array is accepted and yields the all-null result without touching
/// the windows.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `stress_engine_new`.
/// - `samples_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `stress_free_string`.
/// - Returns NULL on error; call `stress_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn stress_engine_process_chunk(
    engine: *mut StressEngineHandle,
    samples_json: *const c_char,
    sampling_hz: u32,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &mut *engine;

    let json_str = match cstr_to_string(samples_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let samples = match SampleAdapter::parse_array(&json_str) {
        Ok(samples) => samples,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let result = handle.engine.process_chunk(&samples, sampling_hz);
    match serde_json::to_string(&result) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Save engine windows to JSON.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `stress_engine_new`.
/// - Returns a newly allocated string that must be freed with `stress_free_string`.
/// - Returns NULL on error; call `stress_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn stress_engine_save_state(engine: *mut StressEngineHandle) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    match (*engine).engine.save_state() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Load engine windows from JSON.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `stress_engine_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error.
/// - On error, call `stress_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn stress_engine_load_state(
    engine: *mut StressEngineHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    let handle = &mut *engine;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return -1;
        }
    };

    match handle.engine.load_state(&json_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by this library.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a `stress_*` function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn stress_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next `stress_*` call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn stress_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn stress_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn chunk_json() -> CString {
        CString::new(
            r#"[
                {"device":"polar","timestamp":"2024-01-15T08:00:00Z","session_id":"s1","hr":70.0},
                {"device":"polar","timestamp":"2024-01-15T08:00:01Z","session_id":"s1","ibi_ms":[800.0,860.0,800.0,860.0]}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_ffi_samples_to_result() {
        let json = chunk_json();
        unsafe {
            let result = stress_samples_to_result(json.as_ptr(), 130);
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("stress.result.v1"));

            stress_free_string(result);
        }
    }

    #[test]
    fn test_ffi_engine_lifecycle() {
        unsafe {
            let engine = stress_engine_new(12);
            assert!(!engine.is_null());

            let json = chunk_json();
            let result = stress_engine_process_chunk(engine, json.as_ptr(), 130);
            assert!(!result.is_null());
            let value: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(result).to_str().unwrap()).unwrap();
            assert_eq!(value["status"], "success");
            assert_eq!(value["hr_mean"], 70.0);
            stress_free_string(result);

            let state = stress_engine_save_state(engine);
            assert!(!state.is_null());

            let engine2 = stress_engine_new(0);
            assert_eq!(stress_engine_load_state(engine2, state), 0);
            assert_eq!((*engine2).engine.total_count(), 1);

            assert_eq!(stress_engine_reset(engine2), 0);
            assert_eq!((*engine2).engine.total_count(), 0);

            stress_free_string(state);
            stress_engine_free(engine);
            stress_engine_free(engine2);
        }
    }

    #[test]
    fn test_ffi_empty_chunk() {
        unsafe {
            let engine = stress_engine_new(12);
            let empty = CString::new("[]").unwrap();
            let result = stress_engine_process_chunk(engine, empty.as_ptr(), 130);
            assert!(!result.is_null());

            let value: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(result).to_str().unwrap()).unwrap();
            assert!(value["hr_mean"].is_null());
            assert_eq!((*engine).engine.total_count(), 0);

            stress_free_string(result);
            stress_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let invalid_json = CString::new("not json").unwrap();
            let result = stress_samples_to_result(invalid_json.as_ptr(), 130);
            assert!(result.is_null());

            let error = stress_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());

            assert!(stress_engine_process_chunk(ptr::null_mut(), invalid_json.as_ptr(), 130).is_null());
            assert_eq!(stress_engine_reset(ptr::null_mut()), -1);

            let engine = stress_engine_new(120);
            let other = stress_engine_new(12);
            let state = stress_engine_save_state(engine);
            assert_eq!(stress_engine_load_state(other, state), -1);
            assert!(!stress_last_error().is_null());

            stress_free_string(state);
            stress_engine_free(engine);
            stress_engine_free(other);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = stress_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
