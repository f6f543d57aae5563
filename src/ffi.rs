//! FFI bindings for healthfold
//!
//! This module provides C-compatible functions for calling healthfold from the
//! mobile host. All functions use C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using
//! `healthfold_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::calendar::parse_date;
use crate::config::AggregationConfig;
use crate::error::MetricsError;
use crate::pipeline::{apple_to_daily_metrics, health_connect_to_daily_metrics, MetricsProcessor};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
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

/// Window size from the C side; negative values are rejected
fn window_days(days: i32) -> Option<u32> {
    u32::try_from(days).ok()
}

/// Hand a pipeline result to C, recording the error on failure
fn result_to_cstr(result: Result<String, MetricsError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Aggregate an Apple Health export and return the payload JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `healthfold_free_string`.
/// - Returns NULL on error; call `healthfold_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn healthfold_apple_to_daily(json: *const c_char, days: i32) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };
    let Some(days) = window_days(days) else {
        set_last_error("days must not be negative");
        return ptr::null_mut();
    };

    result_to_cstr(apple_to_daily_metrics(json_str, days))
}

/// Aggregate a Health Connect export and return the payload JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `healthfold_free_string`.
/// - Returns NULL on error; call `healthfold_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn healthfold_health_connect_to_daily(
    json: *const c_char,
    days: i32,
) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };
    let Some(days) = window_days(days) else {
        set_last_error("days must not be negative");
        return ptr::null_mut();
    };

    result_to_cstr(health_connect_to_daily_metrics(json_str, days))
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a MetricsProcessor
pub struct MetricsProcessorHandle {
    processor: MetricsProcessor,
}

/// Create a new MetricsProcessor.
///
/// # Safety
/// - `config_json` may be NULL for the default configuration, otherwise it
///   must be a valid null-terminated C string.
/// - Returns a pointer to a newly allocated MetricsProcessor.
/// - Must be freed with `healthfold_processor_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn healthfold_processor_new(
    config_json: *const c_char,
) -> *mut MetricsProcessorHandle {
    clear_last_error();

    let processor = if config_json.is_null() {
        MetricsProcessor::new()
    } else {
        let Some(raw) = cstr_to_string(config_json) else {
            set_last_error("Invalid config string pointer");
            return ptr::null_mut();
        };
        match AggregationConfig::from_json(&raw).and_then(MetricsProcessor::with_config) {
            Ok(processor) => processor,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    Box::into_raw(Box::new(MetricsProcessorHandle { processor }))
}

/// Free a MetricsProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `healthfold_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn healthfold_processor_free(processor: *mut MetricsProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Process an Apple Health export with a stateful processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `healthfold_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `healthfold_free_string`.
/// - Returns NULL on error; call `healthfold_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn healthfold_processor_process_apple(
    processor: *mut MetricsProcessorHandle,
    json: *const c_char,
    days: i32,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &mut *processor;

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };
    let Some(days) = window_days(days) else {
        set_last_error("days must not be negative");
        return ptr::null_mut();
    };

    result_to_cstr(handle.processor.process_apple(&json_str, days))
}

/// Process a Health Connect export with a stateful processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `healthfold_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `healthfold_free_string`.
/// - Returns NULL on error; call `healthfold_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn healthfold_processor_process_health_connect(
    processor: *mut MetricsProcessorHandle,
    json: *const c_char,
    days: i32,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &mut *processor;

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };
    let Some(days) = window_days(days) else {
        set_last_error("days must not be negative");
        return ptr::null_mut();
    };

    result_to_cstr(handle.processor.process_health_connect(&json_str, days))
}

/// Save the processor's day history to JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `healthfold_processor_new`.
/// - Returns a newly allocated string that must be freed with `healthfold_free_string`.
/// - Returns NULL on error; call `healthfold_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn healthfold_processor_history_json(
    processor: *mut MetricsProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;
    result_to_cstr(handle.processor.save_history())
}

/// Load the processor's day history from JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `healthfold_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `healthfold_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn healthfold_processor_load_history(
    processor: *mut MetricsProcessorHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &mut *processor;

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return -1;
    };

    match handle.processor.load_history(&json_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Pin the last day of every window (`YYYY-MM-DD`), or pass NULL to follow
/// the local date again.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `healthfold_processor_new`.
/// - `date` must be NULL or a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `healthfold_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn healthfold_processor_set_today(
    processor: *mut MetricsProcessorHandle,
    date: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &mut *processor;

    if date.is_null() {
        handle.processor.set_today(None);
        return 0;
    }

    let Some(date_str) = cstr_to_string(date) else {
        set_last_error("Invalid date string pointer");
        return -1;
    };

    match parse_date(&date_str) {
        Ok(today) => {
            handle.processor.set_today(Some(today));
            0
        }
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by healthfold functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a healthfold function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn healthfold_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next healthfold call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn healthfold_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the healthfold library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn healthfold_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn sample_apple_json() -> CString {
        CString::new(
            r#"{
            "steps": [{"startDate": "2024-01-15T00:00:00.000-0500", "value": 4200}],
            "heartRate": [{"startDate": "2024-01-15T08:00:00.000-0500", "value": 61}]
        }"#,
        )
        .unwrap()
    }

    fn sample_health_connect_json() -> CString {
        CString::new(
            r#"{"steps": [{"startTime": "2024-01-15T08:00:00Z", "endTime": "2024-01-15T09:00:00Z", "count": 5000}]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_ffi_apple_to_daily() {
        let json = sample_apple_json();

        unsafe {
            let result = healthfold_apple_to_daily(json.as_ptr(), 7);
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("payload_version"));
            assert!(result_str.contains("\"source\":\"apple\""));

            healthfold_free_string(result);
        }
    }

    #[test]
    fn test_ffi_health_connect_to_daily() {
        let json = sample_health_connect_json();

        unsafe {
            let result = healthfold_health_connect_to_daily(json.as_ptr(), 0);
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("\"source\":\"google\""));

            healthfold_free_string(result);
        }
    }

    #[test]
    fn test_ffi_processor_lifecycle() {
        unsafe {
            let processor = healthfold_processor_new(ptr::null());
            assert!(!processor.is_null());

            let apple = sample_apple_json();
            let result = healthfold_processor_process_apple(processor, apple.as_ptr(), 3);
            assert!(!result.is_null());
            healthfold_free_string(result);

            let hc = sample_health_connect_json();
            let result = healthfold_processor_process_health_connect(processor, hc.as_ptr(), 3);
            assert!(!result.is_null());
            healthfold_free_string(result);

            let history = healthfold_processor_history_json(processor);
            assert!(!history.is_null());
            let history_str = CStr::from_ptr(history).to_str().unwrap();
            assert!(history_str.starts_with('['));

            let processor2 = healthfold_processor_new(ptr::null());
            assert_eq!(healthfold_processor_load_history(processor2, history), 0);

            healthfold_free_string(history);
            healthfold_processor_free(processor);
            healthfold_processor_free(processor2);
        }
    }

    #[test]
    fn test_ffi_processor_set_today() {
        unsafe {
            let processor = healthfold_processor_new(ptr::null());

            let date = CString::new("2024-01-15").unwrap();
            assert_eq!(healthfold_processor_set_today(processor, date.as_ptr()), 0);

            let apple = sample_apple_json();
            let result = healthfold_processor_process_apple(processor, apple.as_ptr(), 1);
            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("\"steps\":4200"));
            healthfold_free_string(result);

            let bad = CString::new("15/01/2024").unwrap();
            assert_eq!(healthfold_processor_set_today(processor, bad.as_ptr()), -1);
            let error = CStr::from_ptr(healthfold_last_error()).to_str().unwrap();
            assert!(error.contains("Date parse error"));

            assert_eq!(healthfold_processor_set_today(processor, ptr::null()), 0);
            healthfold_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_processor_config() {
        unsafe {
            let valid = CString::new(r#"{"series_target": 24}"#).unwrap();
            let processor = healthfold_processor_new(valid.as_ptr());
            assert!(!processor.is_null());
            healthfold_processor_free(processor);

            let invalid = CString::new(r#"{"resting_percentile": 2.0}"#).unwrap();
            let processor = healthfold_processor_new(invalid.as_ptr());
            assert!(processor.is_null());
            let error = CStr::from_ptr(healthfold_last_error()).to_str().unwrap();
            assert!(error.contains("resting_percentile"));
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let invalid_json = CString::new("not json").unwrap();
            let result = healthfold_apple_to_daily(invalid_json.as_ptr(), 7);
            assert!(result.is_null());

            let error = healthfold_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());

            let json = sample_apple_json();
            assert!(healthfold_apple_to_daily(json.as_ptr(), -1).is_null());

            assert!(healthfold_apple_to_daily(json.as_ptr(), i32::MAX).is_null());
            let error_str = CStr::from_ptr(healthfold_last_error()).to_str().unwrap();
            assert!(error_str.contains("days must be at most"));

            assert!(healthfold_processor_history_json(ptr::null_mut()).is_null());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = healthfold_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
