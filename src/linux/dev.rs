use std::time::Duration;

use crate::core::dev::Device;
use crate::linux::libc as _libc;
use crate::{
    Error,
    Result,
};

/// [TAP interface](https://www.kernel.org/doc/Documentation/networking/tuntap.txt)
/// for sending and receiving raw ethernet frames.
pub struct Tap {
    fd: libc::c_int,
    max_transmission_unit: usize,
}

impl Tap {
    /// Creates or binds to an existing TAP interface with the specified name.
    pub fn new(ifr_name: &str) -> Result<Tap> {
        let ifreq = match _libc::c_ifreq::with_name(ifr_name) {
            Some(ifreq) => ifreq,
            None => return Err(Error::Address),
        };

        unsafe {
            let fd = libc::open(
                "/dev/net/tun\0".as_ptr() as *const libc::c_char,
                libc::O_RDWR,
            );

            if fd == -1 {
                return Err(Error::IO(std::io::Error::last_os_error()));
            }

            let mut _ifreq = ifreq;
            _ifreq.ifr_ifru.ifr_flags = _libc::IFF_TAP | _libc::IFF_NO_PI;
            if libc::ioctl(fd, _libc::TUNSETIFF, &mut _ifreq as *mut _libc::c_ifreq) == -1 {
                let err = std::io::Error::last_os_error();
                libc::close(fd);
                return Err(Error::IO(err));
            }

            let mut _ifreq = ifreq;
            if let Err(err) = Self::inet_ioctl(_libc::SIOCGIFMTU, &mut _ifreq) {
                libc::close(fd);
                return Err(err);
            }

            let max_transmission_unit = _ifreq.ifr_ifru.ifr_mtu as usize;
            info!("Opened TAP {} with MTU {}.", ifr_name, max_transmission_unit);

            Ok(Tap {
                fd,
                max_transmission_unit,
            })
        }
    }

    fn inet_ioctl(request: libc::c_ulong, ifreq: &mut _libc::c_ifreq) -> Result<()> {
        unsafe {
            let fd = libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0);

            if fd == -1 {
                return Err(Error::IO(std::io::Error::last_os_error()));
            }

            if libc::ioctl(fd, request, ifreq as *mut _libc::c_ifreq) == -1 {
                let err = std::io::Error::last_os_error();
                libc::close(fd);
                return Err(Error::IO(err));
            }

            libc::close(fd);
            Ok(())
        }
    }
}

impl Device for Tap {
    fn send(&mut self, buffer: &[u8]) -> Result<()> {
        unsafe {
            let wrote = libc::write(
                self.fd,
                buffer.as_ptr() as *const libc::c_void,
                buffer.len(),
            );

            if wrote < 0 {
                Err(Error::IO(std::io::Error::last_os_error()))
            } else {
                Ok(())
            }
        }
    }

    fn recv(&mut self, buffer: &mut [u8], timeout: Duration) -> Result<usize> {
        let timeout_ms = timeout.as_secs() * 1000 + (timeout.subsec_nanos() / 1_000_000) as u64;
        let mut pollfd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLIN,
            revents: 0,
        };

        unsafe {
            let ready = libc::poll(
                &mut pollfd as *mut libc::pollfd,
                1,
                timeout_ms.min(libc::c_int::max_value() as u64) as libc::c_int,
            );

            if ready < 0 {
                return Err(Error::IO(std::io::Error::last_os_error()));
            } else if ready == 0 {
                return Err(Error::Timeout);
            }

            let read = libc::read(
                self.fd,
                buffer.as_mut_ptr() as *mut libc::c_void,
                buffer.len(),
            );

            if read < 0 {
                Err(Error::IO(std::io::Error::last_os_error()))
            } else {
                Ok(read as usize)
            }
        }
    }

    fn max_transmission_unit(&self) -> usize {
        self.max_transmission_unit
    }
}

impl Drop for Tap {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
