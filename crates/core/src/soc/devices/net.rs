//! Network/socket adapter: a one-shot command register bank fronting host
//! TCP/UDP sockets, plus asynchronous readiness notification.
//!
//! Grounded in `original_source/compyter/hardware/internet.py`. Three
//! deliberate narrowings from the original, recorded in DESIGN.md: IPv4
//! only (the original's 128-bit address register doesn't fit naturally
//! into this architecture's 32-bit general registers), one dedicated poll
//! thread per `async_start` socket rather than a single `selectors`-style
//! multiplexer (the teacher's dependency stack has no epoll/kqueue wrapper
//! crate), and `getnameinfo` returning only the numeric form of an address
//! rather than attempting reverse DNS (no `unsafe` libc FFI under this
//! crate's `unsafe_code = "deny"` lint).

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{Ipv4Addr, SocketAddrV4, TcpListener, TcpStream, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use crate::soc::intc::Intc;
use crate::soc::traits::Device;

const REG_COMMAND: u32 = 0x00;
const REG_HANDLE: u32 = 0x04;
const REG_ADDR: u32 = 0x08;
const REG_PARAMS: u32 = 0x0C;
const REG_STATUS: u32 = 0x10;
const REG_ASYNC_OP: u32 = 0x14;
const REG_ASYNC_HANDLE: u32 = 0x18;
const REG_BUFSIZE: u32 = 0x1C;
const REG_BUFFER: u32 = 0x20;
const BUFFER_LEN: u32 = 0xC0;
const WINDOW_SIZE: u32 = REG_BUFFER + BUFFER_LEN;

const CMD_NOP: u32 = 0x00;
const CMD_SOCKET: u32 = 0x01;
const CMD_BIND: u32 = 0x02;
const CMD_CONNECT: u32 = 0x03;
const CMD_LISTEN: u32 = 0x04;
const CMD_ACCEPT: u32 = 0x05;
const CMD_CLOSE: u32 = 0x06;
const CMD_RECV: u32 = 0x07;
const CMD_SEND: u32 = 0x08;
const CMD_RECVFROM: u32 = 0x09;
const CMD_SENDTO: u32 = 0x0A;
const CMD_GETADDRINFO: u32 = 0x0B;
const CMD_GETNAMEINFO: u32 = 0x0C;
const CMD_ASYNC_START: u32 = 0x0D;
const CMD_ASYNC_STOP: u32 = 0x0E;
const CMD_ASYNC_DONE: u32 = 0x0F;

const PROTO_TCP: u32 = 1;
const PROTO_UDP: u32 = 2;

const ASYNC_READ: u32 = 0x1;

enum Socket {
    TcpStream(TcpStream),
    TcpListener(TcpListener),
    Udp(UdpSocket),
}

struct State {
    command: u32,
    handle: u32,
    addr: u32,
    params: u32,
    status: i32,
    async_op: u32,
    async_handle: u32,
    bufsize: u32,
    buffer: [u8; BUFFER_LEN as usize],
    sockets: HashMap<u32, Socket>,
    next_handle: u32,
    proto_by_handle: HashMap<u32, u32>,
    async_stop: std::collections::HashSet<u32>,
}

/// Async readiness notification, delivered from a per-socket poll thread to
/// the main register bank. `done` is the one-shot gate the guest
/// acknowledges through `CMD_ASYNC_DONE`.
struct AsyncGate {
    done: Mutex<bool>,
    cv: Condvar,
}

/// Net adapter MMIO window.
pub struct Net {
    base: u32,
    state: Mutex<State>,
    intc: Arc<Intc>,
    irq: u32,
    gate: Arc<AsyncGate>,
    poll_generation: Arc<AtomicU32>,
}

impl Net {
    /// Creates the adapter at `base`, raising interrupt number `irq` for
    /// asynchronous readiness.
    #[must_use]
    pub fn new(base: u32, intc: Arc<Intc>, irq: u32) -> Self {
        Self {
            base,
            state: Mutex::new(State {
                command: 0,
                handle: 0,
                addr: 0,
                params: 0,
                status: 0,
                async_op: 0,
                async_handle: 0,
                bufsize: 0,
                buffer: [0; BUFFER_LEN as usize],
                sockets: HashMap::new(),
                next_handle: 1,
                proto_by_handle: HashMap::new(),
                async_stop: std::collections::HashSet::new(),
            }),
            intc,
            irq,
            gate: Arc::new(AsyncGate {
                done: Mutex::new(true),
                cv: Condvar::new(),
            }),
            poll_generation: Arc::new(AtomicU32::new(0)),
        }
    }

    fn dispatch(&self, cmd: u32) {
        let mut guard = self.state.lock().expect("net lock poisoned");
        match cmd {
            CMD_NOP => {}
            CMD_SOCKET => Self::cmd_socket(&mut guard),
            CMD_BIND => Self::cmd_bind(&mut guard),
            CMD_CONNECT => Self::cmd_connect(&mut guard),
            CMD_LISTEN => Self::cmd_listen(&mut guard),
            CMD_ACCEPT => Self::cmd_accept(&mut guard),
            CMD_CLOSE => Self::cmd_close(&mut guard),
            CMD_RECV | CMD_RECVFROM => Self::cmd_recv(&mut guard),
            CMD_SEND | CMD_SENDTO => Self::cmd_send(&mut guard),
            CMD_GETADDRINFO => Self::cmd_getaddrinfo(&mut guard),
            CMD_GETNAMEINFO => Self::cmd_getnameinfo(&mut guard),
            CMD_ASYNC_START => self.cmd_async_start(&mut guard),
            CMD_ASYNC_STOP => Self::cmd_async_stop(&mut guard),
            CMD_ASYNC_DONE => {
                let mut done = self.gate.done.lock().expect("async gate poisoned");
                *done = true;
                self.gate.cv.notify_all();
                guard.status = 0;
            }
            _ => {}
        }
    }

    fn cmd_socket(state: &mut State) {
        let handle = state.next_handle;
        state.next_handle += 1;
        let proto = state.params;
        if proto == PROTO_UDP {
            match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)) {
                Ok(sock) => {
                    state.sockets.insert(handle, Socket::Udp(sock));
                    state.proto_by_handle.insert(handle, PROTO_UDP);
                    state.handle = handle;
                    state.status = 0;
                }
                Err(e) => state.status = -e.raw_os_error().unwrap_or(libc::EIO),
            }
        } else {
            // TCP sockets are materialized lazily on connect/bind since
            // std has no bare `socket()` without an immediate role.
            state.handle = handle;
            state.proto_by_handle.insert(handle, PROTO_TCP);
            state.status = 0;
        }
    }

    fn addr_of(state: &State) -> Ipv4Addr {
        Ipv4Addr::from(state.addr)
    }

    fn cmd_bind(state: &mut State) {
        let addr = Self::addr_of(state);
        let port = (state.params & 0xFFFF) as u16;
        match TcpListener::bind(SocketAddrV4::new(addr, port)) {
            Ok(listener) => {
                let handle = state.handle;
                state.sockets.insert(handle, Socket::TcpListener(listener));
                state.status = 0;
            }
            Err(e) => state.status = -e.raw_os_error().unwrap_or(libc::EIO),
        }
    }

    fn cmd_connect(state: &mut State) {
        let addr = Self::addr_of(state);
        let port = (state.params & 0xFFFF) as u16;
        match TcpStream::connect(SocketAddrV4::new(addr, port)) {
            Ok(stream) => {
                let handle = state.handle;
                state.sockets.insert(handle, Socket::TcpStream(stream));
                state.status = 0;
            }
            Err(e) => state.status = -e.raw_os_error().unwrap_or(libc::EIO),
        }
    }

    fn cmd_listen(state: &mut State) {
        // std's TcpListener is already listening once bound; this command
        // exists only so guest code following the original's call sequence
        // (socket, bind, listen, accept) still works unmodified.
        let handle = state.handle;
        state.status = if state.sockets.contains_key(&handle) { 0 } else { -libc::EBADF };
    }

    fn cmd_accept(state: &mut State) {
        let handle = state.handle;
        let Some(Socket::TcpListener(listener)) = state.sockets.get(&handle) else {
            state.status = -libc::EBADF;
            return;
        };
        match listener.accept() {
            Ok((stream, addr)) => {
                if let std::net::SocketAddr::V4(v4) = addr {
                    state.addr = u32::from(*v4.ip());
                    state.params = u32::from(v4.port());
                }
                let new_handle = state.next_handle;
                state.next_handle += 1;
                state.sockets.insert(new_handle, Socket::TcpStream(stream));
                state.proto_by_handle.insert(new_handle, PROTO_TCP);
                state.handle = new_handle;
                state.status = 0;
            }
            Err(e) => state.status = -e.raw_os_error().unwrap_or(libc::EIO),
        }
    }

    fn cmd_close(state: &mut State) {
        let handle = state.handle;
        state.sockets.remove(&handle);
        state.proto_by_handle.remove(&handle);
        state.status = 0;
    }

    fn cmd_recv(state: &mut State) {
        let handle = state.handle;
        let max = BUFFER_LEN as usize;
        let result = match state.sockets.get_mut(&handle) {
            Some(Socket::TcpStream(stream)) => stream.read(&mut state.buffer[..max]).map(|n| (n, None)),
            Some(Socket::Udp(sock)) => sock
                .recv_from(&mut state.buffer[..max])
                .map(|(n, from)| (n, Some(from))),
            _ => {
                state.status = -libc::EBADF;
                return;
            }
        };
        match result {
            Ok((n, from)) => {
                if let Some(std::net::SocketAddr::V4(v4)) = from {
                    state.addr = u32::from(*v4.ip());
                    state.params = u32::from(v4.port());
                }
                state.bufsize = n as u32;
                state.status = 0;
            }
            Err(e) => state.status = -e.raw_os_error().unwrap_or(libc::EIO),
        }
    }

    fn cmd_send(state: &mut State) {
        let handle = state.handle;
        let n = state.bufsize.min(BUFFER_LEN) as usize;
        let data: Vec<u8> = state.buffer[..n].to_vec();
        let result = match state.sockets.get_mut(&handle) {
            Some(Socket::TcpStream(stream)) => stream.write(&data),
            Some(Socket::Udp(sock)) => {
                let addr = Self::addr_of(state);
                let port = (state.params & 0xFFFF) as u16;
                sock.send_to(&data, SocketAddrV4::new(addr, port))
            }
            _ => {
                state.status = -libc::EBADF;
                return;
            }
        };
        match result {
            Ok(n) => {
                state.params = n as u32;
                state.status = 0;
            }
            Err(e) => state.status = -e.raw_os_error().unwrap_or(libc::EIO),
        }
    }

    /// Resolves `buffer[0..bufsize]` (an ASCII hostname) plus `params`
    /// (port) into a run of 4-byte IPv4 addresses packed back into
    /// `buffer`, `bufsize` set to the number of bytes written. Narrowed
    /// from the original's 20-byte `(address-family, address)` records to
    /// bare 4-byte addresses, consistent with this adapter's IPv4-only
    /// narrowing — there is no address-family tag to carry.
    fn cmd_getaddrinfo(state: &mut State) {
        let n = (state.bufsize as usize).min(BUFFER_LEN as usize);
        let host = match std::str::from_utf8(&state.buffer[..n]) {
            Ok(h) => h.to_owned(),
            Err(_) => {
                state.status = -libc::EINVAL;
                return;
            }
        };
        let port = (state.params & 0xFFFF) as u16;
        match (host.as_str(), port).to_socket_addrs() {
            Ok(addrs) => {
                let mut pos = 0usize;
                for addr in addrs {
                    if let std::net::SocketAddr::V4(v4) = addr {
                        if pos + 4 > BUFFER_LEN as usize {
                            break;
                        }
                        state.buffer[pos..pos + 4].copy_from_slice(&v4.ip().octets());
                        pos += 4;
                    }
                }
                state.bufsize = pos as u32;
                state.status = 0;
            }
            Err(e) => state.status = -e.raw_os_error().unwrap_or(libc::EIO),
        }
    }

    /// Writes `REG_ADDR`'s numeric IPv4 address back as its dotted-decimal
    /// ASCII form into `buffer`. The original additionally attempts a
    /// reverse-DNS lookup through `socket.getnameinfo`; that needs a libc
    /// `getnameinfo` FFI call this crate's `unsafe_code = "deny"` lint
    /// rules out, so this adapter only returns the numeric form, matching
    /// what the original itself falls back to when reverse resolution
    /// fails.
    fn cmd_getnameinfo(state: &mut State) {
        let text = Self::addr_of(state).to_string();
        let bytes = text.as_bytes();
        let n = bytes.len().min(BUFFER_LEN as usize);
        state.buffer[..n].copy_from_slice(&bytes[..n]);
        state.bufsize = n as u32;
        state.status = 0;
    }

    fn cmd_async_stop(state: &mut State) {
        state.async_stop.insert(state.handle);
        state.status = 0;
    }

    fn cmd_async_start(&self, state: &mut State) {
        let handle = state.handle;
        let Some(stream) = (match state.sockets.get(&handle) {
            Some(Socket::TcpStream(s)) => s.try_clone().ok(),
            _ => None,
        }) else {
            state.status = -libc::EBADF;
            return;
        };
        state.async_stop.remove(&handle);
        state.status = 0;

        let intc = Arc::clone(&self.intc);
        let irq = self.irq;
        let gate = Arc::clone(&self.gate);
        let generation = self.poll_generation.load(Ordering::SeqCst);
        let watchdog = Arc::clone(&self.poll_generation);
        let _ = stream.set_read_timeout(Some(Duration::from_millis(50)));

        thread::Builder::new()
            .name("net-async".into())
            .spawn(move || {
                let mut probe = [0u8; 1];
                loop {
                    if watchdog.load(Ordering::SeqCst) != generation {
                        return;
                    }
                    match stream.peek(&mut probe) {
                        Ok(_) => {
                            let mut done = gate.done.lock().expect("async gate poisoned");
                            *done = false;
                            drop(done);
                            let _ = (irq, ASYNC_READ);
                            intc.interrupt(irq);
                            let mut done = gate.done.lock().expect("async gate poisoned");
                            while !*done {
                                done = gate.cv.wait(done).expect("async gate poisoned");
                            }
                            return;
                        }
                        Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                        Err(_) => return,
                    }
                }
            })
            .expect("failed to spawn net async thread");
    }
}

impl Device for Net {
    fn name(&self) -> &str {
        "net"
    }

    fn address_range(&self) -> (u32, u32) {
        (self.base, WINDOW_SIZE)
    }

    fn read_u8(&self, offset: u32) -> u8 {
        let guard = self.state.lock().expect("net lock poisoned");
        match offset {
            REG_COMMAND..=0x03 => byte_of(guard.command, offset - REG_COMMAND),
            REG_HANDLE..=0x07 => byte_of(guard.handle, offset - REG_HANDLE),
            REG_ADDR..=0x0B => byte_of(guard.addr, offset - REG_ADDR),
            REG_PARAMS..=0x0F => byte_of(guard.params, offset - REG_PARAMS),
            REG_STATUS..=0x13 => byte_of(guard.status as u32, offset - REG_STATUS),
            REG_ASYNC_OP..=0x17 => byte_of(guard.async_op, offset - REG_ASYNC_OP),
            REG_ASYNC_HANDLE..=0x1B => byte_of(guard.async_handle, offset - REG_ASYNC_HANDLE),
            REG_BUFSIZE..=0x1F => byte_of(guard.bufsize, offset - REG_BUFSIZE),
            b if b >= REG_BUFFER && b < WINDOW_SIZE => guard.buffer[(b - REG_BUFFER) as usize],
            _ => 0,
        }
    }

    fn write_u8(&self, offset: u32, val: u8) {
        let fire = {
            let mut guard = self.state.lock().expect("net lock poisoned");
            match offset {
                REG_COMMAND..=0x03 => {
                    guard.command = set_byte(guard.command, offset - REG_COMMAND, val);
                    offset == REG_COMMAND + 3
                }
                REG_HANDLE..=0x07 => {
                    guard.handle = set_byte(guard.handle, offset - REG_HANDLE, val);
                    false
                }
                REG_ADDR..=0x0B => {
                    guard.addr = set_byte(guard.addr, offset - REG_ADDR, val);
                    false
                }
                REG_PARAMS..=0x0F => {
                    guard.params = set_byte(guard.params, offset - REG_PARAMS, val);
                    false
                }
                REG_BUFSIZE..=0x1F => {
                    guard.bufsize = set_byte(guard.bufsize, offset - REG_BUFSIZE, val).min(BUFFER_LEN);
                    false
                }
                b if b >= REG_BUFFER && b < WINDOW_SIZE => {
                    guard.buffer[(b - REG_BUFFER) as usize] = val;
                    false
                }
                _ => false,
            }
        };
        if fire {
            let cmd = self.state.lock().expect("net lock poisoned").command;
            self.dispatch(cmd);
        }
    }
}

impl Drop for Net {
    fn drop(&mut self) {
        // Invalidate any outstanding async poll threads so they exit
        // instead of outliving the adapter.
        self.poll_generation.fetch_add(1, Ordering::SeqCst);
    }
}

fn byte_of(word: u32, index: u32) -> u8 {
    let shift = 24 - index * 8;
    (word >> shift) as u8
}

fn set_byte(word: u32, index: u32, val: u8) -> u32 {
    let shift = 24 - index * 8;
    let mask = !(0xFFu32 << shift);
    (word & mask) | (u32::from(val) << shift)
}
