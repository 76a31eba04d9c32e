//! FFI bindings for Session Lens
//!
//! This module provides C-compatible functions for calling the analyzer from
//! other languages. All functions take null-terminated C strings and return
//! allocated memory that must be freed by the caller using `lens_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::AnalyzerConfig;
use crate::error::AnalyzeError;
use crate::session::{render_context, render_transcript, SemanticSession, SessionAnalyzer};

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

/// Return the string, or record the error and return NULL
fn into_result_cstr(result: Result<String, AnalyzeError>) -> *mut c_char {
    match result {
        Ok(s) => string_to_cstr(&s),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Analyze with default thresholds and require at least one interaction
fn analyze_required(json: &str) -> Result<SemanticSession, AnalyzeError> {
    SessionAnalyzer::new()
        .analyze_json(json)?
        .require_interactions()
}

// ============================================================================
// Stateless API
// ============================================================================

/// Analyze a JSON array of raw events and return semantic session JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `lens_free_string`.
/// - Returns NULL on error, including sessions with no meaningful interactions;
///   call `lens_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lens_analyze_json(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    into_result_cstr(analyze_required(&json_str).and_then(|s| s.to_json()))
}

/// Analyze raw events and return the semantic log as plain text, one line per entry.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `lens_free_string`.
/// - Returns NULL on error; call `lens_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lens_render_transcript(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    into_result_cstr(analyze_required(&json_str).map(|s| render_transcript(&s)))
}

/// Analyze raw events and return the structured context block for prompting.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `lens_free_string`.
/// - Returns NULL on error; call `lens_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lens_render_context(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    into_result_cstr(analyze_required(&json_str).map(|s| render_context(&s)))
}

// ============================================================================
// Configured Analyzer API
// ============================================================================

/// Opaque handle to a SessionAnalyzer
pub struct LensAnalyzerHandle {
    analyzer: SessionAnalyzer,
}

/// Create an analyzer from a JSON thresholds document.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string, or NULL for defaults.
/// - Returns a pointer that must be freed with `lens_analyzer_free`.
/// - Returns NULL if the config is invalid; call `lens_last_error` for details.
#[no_mangle]
pub unsafe extern "C" fn lens_analyzer_new(config_json: *const c_char) -> *mut LensAnalyzerHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        AnalyzerConfig::default()
    } else {
        let config_str = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        match AnalyzerConfig::from_json(&config_str) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    let analyzer = match SessionAnalyzer::with_config(config) {
        Ok(analyzer) => analyzer,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };
    let handle = Box::new(LensAnalyzerHandle { analyzer });
    Box::into_raw(handle)
}

/// Free an analyzer.
///
/// # Safety
/// - `analyzer` must be a valid pointer returned by `lens_analyzer_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn lens_analyzer_free(analyzer: *mut LensAnalyzerHandle) {
    if !analyzer.is_null() {
        drop(Box::from_raw(analyzer));
    }
}

/// Analyze a JSON array of raw events with a configured analyzer.
///
/// Unlike `lens_analyze_json`, sessions without interactions are returned
/// as-is; callers check `logs` themselves.
///
/// # Safety
/// - `analyzer` must be a valid pointer returned by `lens_analyzer_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `lens_free_string`.
/// - Returns NULL on error; call `lens_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lens_analyzer_analyze(
    analyzer: *const LensAnalyzerHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if analyzer.is_null() {
        set_last_error("Null analyzer pointer");
        return ptr::null_mut();
    }
    let handle = &*analyzer;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    into_result_cstr(
        handle
            .analyzer
            .analyze_json(&json_str)
            .and_then(|s| s.to_json()),
    )
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Session Lens functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Session Lens function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn lens_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next Session Lens call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn lens_last_error() -> *const c_char {
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
pub unsafe extern "C" fn lens_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
