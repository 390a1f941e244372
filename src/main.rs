use std::{env, error::Error, fs, path::PathBuf};

use h6280::cpu::{Breakpoints, Cpu, CpuConfig, RegisterId};
use h6280::disasm::disassemble_range;
use h6280::MemoryMap;

const DEFAULT_CYCLES: i32 = 1_000_000;

struct StderrLogger {
    level: log::LevelFilter,
}

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logging() {
    let level = env::var("H6280_LOG")
        .ok()
        .and_then(|value| value.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Warn);
    let logger = Box::new(StderrLogger { level });
    if log::set_boxed_logger(logger).is_ok() {
        log::set_max_level(level);
    }
}

fn parse_number(value: &str) -> Option<u32> {
    let value = value.trim();
    match value
        .strip_prefix('$')
        .or_else(|| value.strip_prefix("0x"))
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging();

    let mut args = env::args().skip(1);
    let mut image_path: Option<PathBuf> = None;
    let mut flat_at: Option<u32> = None;
    let mut cycles = DEFAULT_CYCLES;
    let mut disasm_count: Option<usize> = None;
    let mut breakpoints: Vec<u16> = Vec::new();
    let mut load_context: Option<PathBuf> = None;
    let mut save_context: Option<PathBuf> = None;
    let mut debug = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--flat" => match args.next().as_deref().and_then(parse_number) {
                Some(addr) => flat_at = Some(addr),
                None => {
                    eprintln!("--flat requires a physical load address");
                    return Ok(());
                }
            },
            "--cycles" => match args.next().as_deref().and_then(parse_number) {
                Some(value) => cycles = value.min(i32::MAX as u32) as i32,
                None => {
                    eprintln!("--cycles requires a number");
                    return Ok(());
                }
            },
            "--disasm" => match args.next().as_deref().and_then(parse_number) {
                Some(count) => disasm_count = Some(count as usize),
                None => {
                    eprintln!("--disasm requires an instruction count");
                    return Ok(());
                }
            },
            "--break" => match args.next().as_deref().and_then(parse_number) {
                Some(addr) => {
                    breakpoints.push(addr as u16);
                    debug = true;
                }
                None => {
                    eprintln!("--break requires an address");
                    return Ok(());
                }
            },
            "--load-context" => {
                if let Some(path) = args.next() {
                    load_context = Some(PathBuf::from(path));
                } else {
                    eprintln!("--load-context requires a file path");
                    return Ok(());
                }
            }
            "--save-context" => {
                if let Some(path) = args.next() {
                    save_context = Some(PathBuf::from(path));
                } else {
                    eprintln!("--save-context requires a file path");
                    return Ok(());
                }
            }
            "--debug" => debug = true,
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            _ if image_path.is_none() => image_path = Some(PathBuf::from(arg)),
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                return Ok(());
            }
        }
    }

    let image_path = match image_path {
        Some(path) => path,
        None => {
            print_usage();
            return Ok(());
        }
    };
    let image = fs::read(&image_path)?;

    let mut bus = match flat_at {
        Some(addr) => {
            let mut map = MemoryMap::flat();
            map.load(addr, &image);
            map
        }
        None => MemoryMap::pc_engine(&image)?,
    };

    let mut config = CpuConfig::from_env();
    if debug {
        config.debug = true;
    }
    let mut cpu = Cpu::with_config(config);
    cpu.reset(&mut bus);
    if let Some(path) = &load_context {
        cpu.load_context(&fs::read(path)?)?;
    }
    if !breakpoints.is_empty() {
        let mut hook = Breakpoints::new();
        for addr in &breakpoints {
            hook.insert(*addr);
        }
        cpu.set_debug_hook(Some(Box::new(hook)));
    }

    if let Some(count) = disasm_count {
        let pc = cpu.context().pc;
        for instr in disassemble_range(&mut bus, &cpu.context().mmr, pc, count) {
            let bytes: Vec<String> = std::iter::once(instr.opcode)
                .chain(instr.operand_bytes.iter().copied())
                .map(|b| format!("{b:02X}"))
                .collect();
            println!("{:04X}  {:<21} {}", instr.address, bytes.join(" "), instr);
        }
    }

    let used = cpu.execute(&mut bus, cycles);
    println!("Executed {used} of {cycles} cycles.");
    for id in RegisterId::ALL {
        if let Some(value) = cpu.get_reg(id) {
            print!("{}={:X} ", id.name(), value);
        }
    }
    println!();
    let mmr: Vec<String> = cpu
        .context()
        .mmr
        .iter()
        .map(|bank| format!("{bank:02X}"))
        .collect();
    println!("MPR {}", mmr.join(" "));

    if let Some(path) = &save_context {
        fs::write(path, cpu.save_context()?)?;
    }

    Ok(())
}

fn print_usage() {
    eprintln!("Usage: h6280 <image> [--flat <addr>] [--cycles <n>] [--disasm <n>] [--break <addr>]");
    eprintln!("  image : raw HuCard ROM, mirrored over physical pages $00-$7F");
    eprintln!("Options:");
    eprintln!("  --flat <addr>          Load the image into flat RAM at a physical address instead");
    eprintln!("  --cycles <n>           Cycle budget for the run (default {DEFAULT_CYCLES})");
    eprintln!("  --disasm <n>           Disassemble n instructions from the reset PC first");
    eprintln!("  --break <addr>         Stop at a logical address (repeatable, enables debug)");
    eprintln!("  --load-context <file>  Restore registers from a saved context after reset");
    eprintln!("  --save-context <file>  Save registers after the run");
    eprintln!("  --debug                Enable debug hooks and mapper register access");
    eprintln!("  --help                 Show this message");
    eprintln!();
    eprintln!("Numbers accept decimal, $hex or 0xhex. H6280_LOG sets the log level.");
}
