//! Hosted runtime of the string interop helpers called by lowered programs.
//!
//! Every returned string is a fresh NUL-terminated heap allocation that the
//! generated code never frees.

use std::ffi::{c_char, CStr, CString};

/// Returned when a result cannot be represented as a C string.
const NIL: &CStr = c"nil";

fn into_raw(text: String) -> *mut c_char {
    match CString::new(text) {
        Ok(text) => text.into_raw(),
        Err(_) => NIL.as_ptr().cast_mut(),
    }
}

/// Reads a C string, treating a null pointer as `nil`.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for `'a`.
unsafe fn read<'a>(ptr: *const c_char) -> &'a CStr {
    if ptr.is_null() {
        NIL
    } else {
        // SAFETY: guaranteed by the caller.
        unsafe { CStr::from_ptr(ptr) }
    }
}

/// Concatenates two strings into a new one.
///
/// # Safety
///
/// Both pointers must be null or point to NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn __yttria_concat_str(x: *const c_char, y: *const c_char) -> *mut c_char {
    // SAFETY: guaranteed by the caller.
    let (x, y) = unsafe { (read(x), read(y)) };
    let mut bytes = Vec::with_capacity(x.count_bytes() + y.count_bytes() + 1);
    bytes.extend_from_slice(x.to_bytes());
    bytes.extend_from_slice(y.to_bytes());
    match CString::new(bytes) {
        Ok(joined) => joined.into_raw(),
        Err(_) => NIL.as_ptr().cast_mut(),
    }
}

/// Decimal text of an integer. Narrower integers are extended by the caller.
#[no_mangle]
pub extern "C" fn __yttria_conv_i2s(value: i64) -> *mut c_char {
    into_raw(value.to_string())
}

/// Shortest text that reads back as the same float.
#[no_mangle]
pub extern "C" fn __yttria_conv_f2s(value: f64) -> *mut c_char {
    into_raw(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn take(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        // SAFETY: every helper returns a pointer from `CString::into_raw`.
        let text = unsafe { CString::from_raw(ptr) };
        text.into_string().unwrap()
    }

    #[test]
    fn converts_numbers() {
        assert_eq!(take(__yttria_conv_i2s(-42)), "-42");
        assert_eq!(take(__yttria_conv_i2s(i64::MIN)), i64::MIN.to_string());
        assert_eq!(take(__yttria_conv_f2s(2.5)), "2.5");
        assert_eq!(take(__yttria_conv_f2s(3.0)), "3");
    }

    #[test]
    fn concatenates() {
        let joined = unsafe { __yttria_concat_str(c"The output is ".as_ptr(), c"97".as_ptr()) };
        assert_eq!(take(joined), "The output is 97");
        let joined = unsafe { __yttria_concat_str(std::ptr::null(), c"!".as_ptr()) };
        assert_eq!(take(joined), "nil!");
    }
}
