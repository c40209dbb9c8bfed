// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dynamic binding to a DRMAA 1.0 C library (`libdrmaa.so`), loaded with
//! `libloading` since no maintained `drmaa` crate exists on crates.io
//! (see DESIGN.md). Covers the handful of entry points this backend
//! needs — template alloc/set/run, non-blocking wait, control/terminate
//! — not the full DRMAA surface (bulk jobs, rusage, the optional
//! attribute set beyond remote command and native specification).

use super::{DrmaaError, DrmaaSession, DrmaaWaitOutcome};
use libloading::{Library, Symbol};
use oj_core::WorkflowError;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_long};
use std::path::Path;
use std::ptr;

const ERROR_STRING_LEN: usize = 1024;
const JOBID_LEN: usize = 128;

const DRMAA_TIMEOUT_NO_WAIT: c_long = 0;
const DRMAA_CONTROL_TERMINATE: c_int = 2;
const DRMAA_ERRNO_SUCCESS: c_int = 0;
const DRMAA_ERRNO_EXIT_TIMEOUT: c_int = 25;
const DRMAA_ERRNO_INVALID_ATTRIBUTE_VALUE: c_int = 6;

type JobTemplate = *mut std::ffi::c_void;

type FnInit = unsafe extern "C" fn(*const c_char, *mut c_char, usize) -> c_int;
type FnExit = unsafe extern "C" fn(*mut c_char, usize) -> c_int;
type FnAllocJt = unsafe extern "C" fn(*mut JobTemplate, *mut c_char, usize) -> c_int;
type FnDeleteJt = unsafe extern "C" fn(JobTemplate, *mut c_char, usize) -> c_int;
type FnSetAttr =
    unsafe extern "C" fn(JobTemplate, *const c_char, *const c_char, *mut c_char, usize) -> c_int;
type FnRunJob = unsafe extern "C" fn(*mut c_char, usize, JobTemplate, *mut c_char, usize) -> c_int;
#[allow(clippy::type_complexity)]
type FnWait = unsafe extern "C" fn(
    *const c_char,
    *mut c_char,
    usize,
    *mut c_int,
    c_long,
    *mut *mut std::ffi::c_void,
    *mut c_char,
    usize,
) -> c_int;
type FnWifexited = unsafe extern "C" fn(*mut c_int, c_int, *mut c_char, usize) -> c_int;
type FnWexitstatus = unsafe extern "C" fn(*mut c_int, c_int, *mut c_char, usize) -> c_int;
type FnControl = unsafe extern "C" fn(*const c_char, c_int, *mut c_char, usize) -> c_int;

/// A loaded DRMAA 1.0 session. Every call re-resolves its symbol from the
/// loaded library rather than caching `Symbol`s, to sidestep the
/// self-referential-struct problem of storing a `Symbol` alongside the
/// `Library` it borrows from — `libloading`'s documented pattern for this
/// shape. A single `call_lock` serializes all session calls, since the
/// reference DRMAA implementations this binds to are not documented safe
/// for concurrent use of one session handle.
pub struct NativeDrmaaSession {
    lib: Library,
    call_lock: parking_lot::Mutex<()>,
}

impl NativeDrmaaSession {
    /// Load `lib_path` and call `drmaa_init(NULL)`. `lib_path` is typically
    /// `libdrmaa.so` resolved via the cluster scheduler's installed
    /// client library (e.g. `$SGE_ROOT/lib/.../libdrmaa.so`).
    pub fn load(lib_path: &Path) -> Result<Self, WorkflowError> {
        let lib = unsafe { Library::new(lib_path) }.map_err(|source| WorkflowError::DrmaaLoad {
            path: lib_path.to_path_buf(),
            source,
        })?;
        let session = Self {
            lib,
            call_lock: parking_lot::Mutex::new(()),
        };
        if let Err(e) = session.init_session() {
            return Err(WorkflowError::DrmaaInit(e.to_string()));
        }
        Ok(session)
    }

    fn init_session(&self) -> Result<(), DrmaaError> {
        let _guard = self.call_lock.lock();
        let mut diag = [0u8; ERROR_STRING_LEN];
        unsafe {
            let f: Symbol<FnInit> = self.symbol(b"drmaa_init\0")?;
            let rc = f(ptr::null(), diag.as_mut_ptr() as *mut c_char, diag.len());
            check(rc, &diag)
        }
    }

    unsafe fn symbol<T>(&self, name: &[u8]) -> Result<Symbol<T>, DrmaaError> {
        self.lib
            .get(name)
            .map_err(|e| DrmaaError::Internal(format!("symbol {:?} not found: {e}", CStr::from_bytes_with_nul_unchecked(name))))
    }
}

fn check(rc: c_int, diag: &[u8]) -> Result<(), DrmaaError> {
    if rc == DRMAA_ERRNO_SUCCESS {
        return Ok(());
    }
    let message = diagnosis_to_string(diag);
    if rc == DRMAA_ERRNO_INVALID_ATTRIBUTE_VALUE {
        Err(DrmaaError::InvalidAttribute(message))
    } else {
        Err(DrmaaError::Internal(message))
    }
}

fn diagnosis_to_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

impl DrmaaSession for NativeDrmaaSession {
    fn run_job(&self, jobscript: &str, native_specification: &str) -> Result<String, DrmaaError> {
        let _guard = self.call_lock.lock();
        let mut diag = [0u8; ERROR_STRING_LEN];

        let remote_command = CString::new(jobscript)
            .map_err(|e| DrmaaError::Internal(format!("jobscript path is not representable: {e}")))?;
        let native_spec = CString::new(native_specification)
            .map_err(|e| DrmaaError::Internal(format!("native specification is not representable: {e}")))?;

        unsafe {
            let mut jt: JobTemplate = ptr::null_mut();
            let alloc: Symbol<FnAllocJt> = self.symbol(b"drmaa_allocate_job_template\0")?;
            check(
                alloc(&mut jt, diag.as_mut_ptr() as *mut c_char, diag.len()),
                &diag,
            )?;

            let set_attr: Symbol<FnSetAttr> = self.symbol(b"drmaa_set_attribute\0")?;
            let remote_cmd_name = CString::new("drmaa_remote_command").map_err(|_| {
                DrmaaError::Internal("attribute name not representable".to_string())
            })?;
            let native_spec_name = CString::new("drmaa_native_specification").map_err(|_| {
                DrmaaError::Internal("attribute name not representable".to_string())
            })?;

            let rc = set_attr(
                jt,
                remote_cmd_name.as_ptr(),
                remote_command.as_ptr(),
                diag.as_mut_ptr() as *mut c_char,
                diag.len(),
            );
            if let Err(e) = check(rc, &diag) {
                let delete: Symbol<FnDeleteJt> = self.symbol(b"drmaa_delete_job_template\0")?;
                delete(jt, diag.as_mut_ptr() as *mut c_char, diag.len());
                return Err(e);
            }

            if !native_specification.is_empty() {
                let rc = set_attr(
                    jt,
                    native_spec_name.as_ptr(),
                    native_spec.as_ptr(),
                    diag.as_mut_ptr() as *mut c_char,
                    diag.len(),
                );
                if let Err(e) = check(rc, &diag) {
                    let delete: Symbol<FnDeleteJt> = self.symbol(b"drmaa_delete_job_template\0")?;
                    delete(jt, diag.as_mut_ptr() as *mut c_char, diag.len());
                    return Err(e);
                }
            }

            let mut jobid_buf = [0u8; JOBID_LEN];
            let run: Symbol<FnRunJob> = self.symbol(b"drmaa_run_job\0")?;
            let rc = run(
                jobid_buf.as_mut_ptr() as *mut c_char,
                jobid_buf.len(),
                jt,
                diag.as_mut_ptr() as *mut c_char,
                diag.len(),
            );

            let delete: Symbol<FnDeleteJt> = self.symbol(b"drmaa_delete_job_template\0")?;
            delete(jt, diag.as_mut_ptr() as *mut c_char, diag.len());

            check(rc, &diag)?;
            Ok(diagnosis_to_string(&jobid_buf))
        }
    }

    fn wait_no_block(&self, jobid: &str) -> Result<DrmaaWaitOutcome, DrmaaError> {
        let _guard = self.call_lock.lock();
        let mut diag = [0u8; ERROR_STRING_LEN];
        let mut out_jobid = [0u8; JOBID_LEN];
        let mut stat: c_int = 0;

        let jobid_c = CString::new(jobid)
            .map_err(|e| DrmaaError::Internal(format!("jobid is not representable: {e}")))?;

        unsafe {
            let wait: Symbol<FnWait> = self.symbol(b"drmaa_wait\0")?;
            let rc = wait(
                jobid_c.as_ptr(),
                out_jobid.as_mut_ptr() as *mut c_char,
                out_jobid.len(),
                &mut stat,
                DRMAA_TIMEOUT_NO_WAIT,
                ptr::null_mut(),
                diag.as_mut_ptr() as *mut c_char,
                diag.len(),
            );

            if rc == DRMAA_ERRNO_EXIT_TIMEOUT {
                return Ok(DrmaaWaitOutcome::StillRunning);
            }
            check(rc, &diag)?;

            let mut exited: c_int = 0;
            let wifexited: Symbol<FnWifexited> = self.symbol(b"drmaa_wifexited\0")?;
            check(
                wifexited(&mut exited, stat, diag.as_mut_ptr() as *mut c_char, diag.len()),
                &diag,
            )?;

            let mut exit_status: c_int = 0;
            if exited != 0 {
                let wexitstatus: Symbol<FnWexitstatus> = self.symbol(b"drmaa_wexitstatus\0")?;
                check(
                    wexitstatus(
                        &mut exit_status,
                        stat,
                        diag.as_mut_ptr() as *mut c_char,
                        diag.len(),
                    ),
                    &diag,
                )?;
            }

            Ok(DrmaaWaitOutcome::Exited {
                has_exited: exited != 0,
                exit_status,
            })
        }
    }

    fn terminate(&self, jobid: &str) -> Result<(), DrmaaError> {
        let _guard = self.call_lock.lock();
        let mut diag = [0u8; ERROR_STRING_LEN];
        let jobid_c = CString::new(jobid)
            .map_err(|e| DrmaaError::Internal(format!("jobid is not representable: {e}")))?;
        unsafe {
            let control: Symbol<FnControl> = self.symbol(b"drmaa_control\0")?;
            let rc = control(
                jobid_c.as_ptr(),
                DRMAA_CONTROL_TERMINATE,
                diag.as_mut_ptr() as *mut c_char,
                diag.len(),
            );
            check(rc, &diag)
        }
    }

    fn exit(&self) {
        let _guard = self.call_lock.lock();
        let mut diag = [0u8; ERROR_STRING_LEN];
        unsafe {
            let Ok(f) = self.symbol::<FnExit>(b"drmaa_exit\0") else {
                return;
            };
            let rc = f(diag.as_mut_ptr() as *mut c_char, diag.len());
            if let Err(e) = check(rc, &diag) {
                tracing::warn!(error = %e, "drmaa_exit failed");
            }
        }
    }
}
