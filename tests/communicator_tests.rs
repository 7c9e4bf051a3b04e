use std::thread;

use mesh_dofmap::algs::communicator::{CommTag, Communicator, LocalComm, NoComm};
use mesh_dofmap::mesh_error::MeshError;

#[test]
fn ring_exchange_on_threads() {
    let tag = CommTag::new(0x1000);
    let n = 5;
    let handles: Vec<_> = LocalComm::world(n)
        .into_iter()
        .map(|c| {
            thread::spawn(move || {
                let next = (c.rank() + 1) % c.size();
                let prev = (c.rank() + c.size() - 1) % c.size();
                c.send(next, tag, &[c.rank() as u8]).unwrap();
                let got = c.recv(prev, tag).unwrap();
                c.barrier().unwrap();
                (c.rank(), got[0] as usize)
            })
        })
        .collect();
    for h in handles {
        let (rank, from) = h.join().unwrap();
        assert_eq!(from, (rank + n - 1) % n);
    }
}

#[test]
fn fifo_per_sender() {
    let tag = CommTag::new(0x1001);
    let world = LocalComm::world(3);
    for i in 0..10u8 {
        world[0].send(2, tag, &[i]).unwrap();
        world[1].send(2, tag, &[100 + i]).unwrap();
    }
    let from0: Vec<u8> = (0..10).map(|_| world[2].recv(0, tag).unwrap()[0]).collect();
    let from1: Vec<u8> = (0..10).map(|_| world[2].recv(1, tag).unwrap()[0]).collect();
    assert_eq!(from0, (0u8..10).collect::<Vec<_>>());
    assert_eq!(from1, (100u8..110).collect::<Vec<_>>());
}

#[test]
fn abort_releases_a_barrier() {
    let mut world = LocalComm::world(3);
    let c2 = world.pop().unwrap();
    let c1 = world.pop().unwrap();
    let waiting = thread::spawn(move || c1.barrier());
    c2.abort(4);
    assert_eq!(waiting.join().unwrap(), Err(MeshError::Aborted(4)));
    assert_eq!(c2.send(0, CommTag::new(1), &[1]), Err(MeshError::Aborted(4)));
}

#[test]
fn nocomm_refuses_messages() {
    let c = NoComm;
    assert_eq!(c.rank(), 0);
    assert!(matches!(c.send(0, CommTag::new(1), &[]), Err(MeshError::Comm(_))));
}
