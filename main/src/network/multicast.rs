use socket2::Domain;
use socket2::Protocol;
use socket2::Socket;
use socket2::Type;
use std::net::Ipv4Addr;
use std::net::SocketAddrV4;
use std::net::UdpSocket as StdUdpSocket;
use tokio::net::UdpSocket;

/// Creates a socket on an ephemeral port of `local_ip` that multicasts through
/// the same interface.
pub fn new_probe_socket(local_ip: Ipv4Addr) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    let local_address = SocketAddrV4::new(local_ip, 0);
    socket.bind(&local_address.into())?;
    socket.set_multicast_if_v4(&local_ip)?;
    socket.set_nonblocking(true)?;
    new_async_socket(socket)
}

fn new_async_socket(socket: Socket) -> std::io::Result<UdpSocket> {
    let socket: StdUdpSocket = socket.into();
    socket.try_into()
}
