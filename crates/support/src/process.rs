use nix::{
    fcntl::{open, OFlag},
    sys::{
        resource::{getrlimit, Resource, RLIM_INFINITY},
        stat::{umask, Mode},
    },
    unistd::{chdir, close, dup2, fork, setsid, ForkResult},
};

use crate::errors::ProcessError;

/// Turn the process into a UNIX daemon.
///
/// Detaches from the controlling terminal, changes the working directory to
/// `/` so no mount point stays referenced, resets the umask, closes every
/// inherited file descriptor and reopens stdin/stdout/stderr on `/dev/null`.
///
/// Must be called before the async runtime (or any other thread) is started:
/// `fork` only carries the calling thread into the child.
pub fn daemonize() -> Result<(), ProcessError> {
    // SAFETY: called from a single-threaded process, before the runtime exists.
    match unsafe { fork() }? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }
    setsid()?;
    // SAFETY: same as above; the first child is still single-threaded.
    match unsafe { fork() }? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }
    chdir("/")?;
    umask(Mode::empty());
    let (_soft, hard) = getrlimit(Resource::RLIMIT_NOFILE)?;
    let max_fd = if hard == RLIM_INFINITY {
        1024
    } else {
        hard.min(65536)
    };
    for fd in 0..max_fd as i32 {
        // most descriptors in the range are not open
        let _ = close(fd);
    }
    // all descriptors are closed, so this open returns fd 0
    let dev_null = open("/dev/null", OFlag::O_RDWR, Mode::empty())?;
    dup2(dev_null, 1)?;
    dup2(dev_null, 2)?;
    Ok(())
}
