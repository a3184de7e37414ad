use blockpool::{Error, Pool, PoolConfig};

const BUFFER_SIZE: usize = 4096;
const BLOCK_SIZE: usize = 64;
const ALIGN: usize = 8;

#[repr(align(16))]
struct Memory<const N: usize>([u8; N]);
impl<const N: usize> Memory<N> {
    fn new() -> Box<Self> {
        Box::new(Self([0; N]))
    }
}

fn assert_conserved(pool: &Pool<'_>) {
    let stats = pool.stats().unwrap();
    assert_eq!(stats.free_blocks + stats.used_blocks, stats.total_blocks);
}

#[test]
fn page_of_64_byte_blocks() {
    let mut memory = Memory::<BUFFER_SIZE>::new();
    let pool = Pool::new(&mut memory.0, BLOCK_SIZE, ALIGN).unwrap();
    assert!(pool.total_blocks() >= 63);

    let b1 = pool.allocate().unwrap();
    let b2 = pool.allocate().unwrap();
    assert_ne!(b1, b2);
    assert_eq!(pool.stats().unwrap().used_blocks, 2);
    assert_conserved(&pool);

    pool.release(b1.as_ptr()).unwrap();
    pool.release(b2.as_ptr()).unwrap();
    let stats = pool.stats().unwrap();
    assert_eq!(stats.used_blocks, 0);
    assert_eq!(stats.free_blocks, stats.total_blocks);
    assert_eq!(stats.peak_usage, 2);
    assert_eq!(stats.alloc_count, 2);
    assert_eq!(stats.free_count, 2);
}

#[test]
fn invalid_configurations() {
    let mut memory = Memory::<BUFFER_SIZE>::new();
    assert_eq!(Pool::new(&mut memory.0, BLOCK_SIZE, 7).err(), Some(Error::Alignment));
    assert_eq!(Pool::new(&mut memory.0[1..], BLOCK_SIZE, ALIGN).err(), Some(Error::Alignment));
    assert_eq!(
        Pool::new(&mut memory.0, core::mem::size_of::<usize>() - 1, ALIGN).err(),
        Some(Error::InvalidSize)
    );
}

#[test]
fn exhaust_and_refill() {
    let mut memory = Memory::<2048>::new();
    let pool = Pool::new(&mut memory.0, BLOCK_SIZE, ALIGN).unwrap();

    let blocks: Vec<_> = (0..pool.total_blocks()).map(|_| pool.allocate().unwrap()).collect();
    assert_eq!(pool.allocate(), Err(Error::OutOfMemory));
    assert_conserved(&pool);

    for block in &blocks {
        pool.release(block.as_ptr()).unwrap();
    }
    assert_eq!(pool.stats().unwrap().used_blocks, 0);
    assert!(pool.allocate().is_ok());
}

#[test]
fn release_errors() {
    let mut memory = Memory::<2048>::new();
    let pool = Pool::new(&mut memory.0, BLOCK_SIZE, ALIGN).unwrap();
    let block = pool.allocate().unwrap().as_ptr();

    let mut external = [0u8; 64];
    assert_eq!(pool.release(external.as_mut_ptr()), Err(Error::InvalidBlock));
    assert_eq!(pool.release(block.wrapping_add(1)), Err(Error::InvalidBlock));
    assert_eq!(pool.release(block), Ok(()));
    assert_eq!(pool.release(block), Err(Error::DoubleFree));
    assert_conserved(&pool);
}

#[test]
fn reset_after_use() {
    let mut memory = Memory::<BUFFER_SIZE>::new();
    let pool = Pool::new(&mut memory.0, BLOCK_SIZE, ALIGN).unwrap();
    let total = pool.total_blocks() as u32;
    for _ in 0..10 {
        pool.allocate().unwrap();
    }
    let freed = pool.allocate().unwrap();
    pool.release(freed.as_ptr()).unwrap();

    pool.reset().unwrap();
    let stats = pool.stats().unwrap();
    assert_eq!(stats.used_blocks, 0);
    assert_eq!(stats.alloc_count, 0);
    assert_eq!(stats.free_count, 0);
    assert_eq!(stats.peak_usage, 0);
    assert_eq!(stats.total_blocks, total);

    // freed before the reset and again afterwards
    assert_eq!(pool.release(freed.as_ptr()), Err(Error::DoubleFree));
}

#[test]
fn stress_cycles() {
    let mut memory = Memory::<8192>::new();
    let pool = Pool::new(&mut memory.0, BLOCK_SIZE, ALIGN).unwrap();
    let total = pool.total_blocks();
    assert!(total < 200);

    let mut handed_out = 0;
    for _ in 0..10 {
        let blocks: Vec<_> = (0..200).filter_map(|_| pool.allocate().ok()).collect();
        assert_eq!(blocks.len(), total);
        handed_out += blocks.len();
        for block in blocks {
            pool.release(block.as_ptr()).unwrap();
        }
        assert_conserved(&pool);
    }

    let stats = pool.stats().unwrap();
    assert_eq!(stats.used_blocks, 0);
    assert_eq!(stats.alloc_count as usize, handed_out);
    assert_eq!(stats.free_count as usize, handed_out);
    assert_eq!(stats.peak_usage as usize, total);
}

#[test]
fn typed_packet_pool() {
    #[repr(C)]
    struct Packet {
        data: [u8; 256],
        length: u32,
        timestamp: u32,
    }

    let mut memory = Memory::<{ 264 * 16 }>::new();
    let pool = Pool::with_config(&mut memory.0, PoolConfig::for_type::<Packet>()).unwrap();
    assert_eq!(pool.block_size(), core::mem::size_of::<Packet>());
    assert_eq!(pool.total_blocks(), 15);

    let tx = pool.allocate().unwrap().cast::<Packet>();
    let rx = pool.allocate().unwrap().cast::<Packet>();
    // SAFETY: the blocks are large and aligned enough for a `Packet`
    unsafe {
        tx.as_ptr().write(Packet {
            data: [0xaa; 256],
            length: 128,
            timestamp: 1000,
        });
        rx.as_ptr().write(Packet {
            data: [0x55; 256],
            length: 64,
            timestamp: 1001,
        });
        assert_eq!((*tx.as_ptr()).length, 128);
        assert_eq!((*rx.as_ptr()).timestamp, 1001);
        assert_eq!((*tx.as_ptr()).data[255], 0xaa);
    }

    let stats = pool.stats().unwrap();
    assert_eq!((stats.used_blocks, stats.peak_usage), (2, 2));
    pool.release(tx.as_ptr().cast()).unwrap();
    pool.release(rx.as_ptr().cast()).unwrap();
}
