// Copyright (c) 2017-2024 Rene van der Meer
//
// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL
// THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

use std::io;
use std::os::unix::io::RawFd;
use std::result;
use std::time::Duration;

pub use libc::{epoll_event, EPOLLERR, EPOLLET, EPOLLPRI};

pub type Result<T> = result::Result<T, io::Error>;

#[derive(Debug)]
pub struct Epoll {
    fd: RawFd,
}

impl Epoll {
    pub fn new() -> Result<Epoll> {
        Ok(Epoll {
            fd: parse_retval!(unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) })?,
        })
    }

    pub fn add(&self, fd: RawFd, id: u64, event_mask: i32) -> Result<()> {
        let mut event = epoll_event {
            events: event_mask as u32,
            u64: id,
        };

        parse_retval!(unsafe { libc::epoll_ctl(self.fd, libc::EPOLL_CTL_ADD, fd, &mut event) })?;

        Ok(())
    }

    // A signal delivered while blocked returns EINTR, even with SA_RESTART.
    pub fn wait(&self, events: &mut [epoll_event], timeout: Option<Duration>) -> Result<usize> {
        if events.is_empty() {
            return Ok(0);
        }

        let timeout: i32 = if let Some(duration) = timeout {
            duration.as_millis().min(i32::MAX as u128) as i32
        } else {
            -1
        };

        Ok(parse_retval!(unsafe {
            libc::epoll_wait(
                self.fd,
                events.as_mut_ptr(),
                events.len() as i32,
                timeout,
            )
        })? as usize)
    }
}

impl Drop for Epoll {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipe() -> (RawFd, RawFd) {
        let mut fds = [0; 2];
        parse_retval!(unsafe { libc::pipe(fds.as_mut_ptr()) }).unwrap();
        (fds[0], fds[1])
    }

    #[test]
    fn idle_descriptor_times_out() {
        let (rx, tx) = pipe();
        let poll = Epoll::new().unwrap();
        poll.add(tx, 7, EPOLLERR | EPOLLET | EPOLLPRI).unwrap();

        let mut events = [epoll_event { events: 0, u64: 0 }; 1];
        let count = poll.wait(&mut events, Some(Duration::ZERO)).unwrap();
        assert_eq!(count, 0);

        unsafe {
            libc::close(rx);
            libc::close(tx);
        }
    }

    #[test]
    fn error_condition_reports_registered_id() {
        let (rx, tx) = pipe();
        let poll = Epoll::new().unwrap();
        poll.add(tx, 7, EPOLLERR | EPOLLET | EPOLLPRI).unwrap();

        // Closing the read end raises EPOLLERR on the write end.
        unsafe {
            libc::close(rx);
        }

        let mut events = [epoll_event { events: 0, u64: 0 }; 2];
        let count = poll.wait(&mut events, Some(Duration::from_secs(1))).unwrap();

        assert_eq!(count, 1);
        let id = events[0].u64;
        assert_eq!(id, 7);

        unsafe {
            libc::close(tx);
        }
    }
}
