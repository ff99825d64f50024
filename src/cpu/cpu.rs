use crate::{
    bus::{Bus, BusError},
    cpu::{
        flags::{
            FLAG_BREAK, FLAG_CARRY, FLAG_DECIMAL, FLAG_INTERRUPT_DISABLE, FLAG_NEGATIVE,
            FLAG_OVERFLOW, FLAG_UNUSED, FLAG_ZERO, STATUS_AT_RESET,
        },
        opcodes::{AddressingMode, INSTRUCTIONS, Instruction, Operation, is_documented},
    },
};

use ansi_term::Colour::{Green, Yellow};

const NMI_VECTOR: u16 = 0xFFFA;
const RESET_VECTOR: u16 = 0xFFFC;
const IRQ_VECTOR: u16 = 0xFFFE;

/// Cost of the NMI/IRQ/reset entry sequence.
const INTERRUPT_CYCLES: u32 = 7;

/// Where an instruction's data lives once its addressing mode has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Implied,
    Accumulator,
    Address { addr: u16, page_crossed: bool },
}

pub struct CPU<B: Bus> {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: u8,
    pub bus: B,
    /// CPU cycles elapsed since reset, including interrupt entry.
    pub total_cycles: u64,
    /// Print a nestest-style line before every instruction.
    pub trace: bool,
    remaining: u32,
}

impl<B: Bus> CPU<B> {
    pub fn new(bus: B) -> Self {
        CPU {
            a: 0,
            x: 0,
            y: 0,
            sp: 0,
            pc: 0,
            status: FLAG_UNUSED,
            bus,
            total_cycles: 0,
            trace: false,
            remaining: 0,
        }
    }

    /// Power-on/reset sequence. The stack pointer moves down by three without
    /// writing (the pushes are suppressed on reset), so a fresh CPU ends at $FD.
    pub fn reset(&mut self) {
        self.sp = self.sp.wrapping_sub(3);
        self.status = STATUS_AT_RESET;
        self.a = 0;
        self.x = 0;
        self.y = 0;

        self.pc = self.read_word(RESET_VECTOR);

        self.remaining = INTERRUPT_CYCLES;
        self.total_cycles = INTERRUPT_CYCLES as u64;
    }

    /// Advances the CPU by one of its own cycles. A whole instruction executes on
    /// the cycle the counter runs out and its cost is paid off by the following ticks.
    pub fn tick(&mut self) -> Result<(), BusError> {
        if self.bus.dma_active() {
            return Ok(());
        }

        if self.remaining == 0 {
            if self.bus.poll_irq() && self.status & FLAG_INTERRUPT_DISABLE == 0 {
                self.irq()?;
            } else {
                self.remaining = self.step()?;
            }
        }

        self.remaining -= 1;
        Ok(())
    }

    /// Cycles still owed by the instruction (or interrupt) in flight.
    pub fn pending_cycles(&self) -> u32 {
        self.remaining
    }

    /// Executes exactly one instruction and returns what it cost.
    pub fn step(&mut self) -> Result<u32, BusError> {
        let pc = self.pc;
        let opcode = self.fetch_byte();
        let instruction = INSTRUCTIONS[opcode as usize];

        if self.trace {
            self.trace(pc, opcode, instruction);
        }
        if !is_documented(opcode) {
            tracing::trace!(opcode, pc, "undefined opcode executed as NOP");
        }

        let operand = self.resolve(instruction.mode);

        let mut cycles = instruction.cycles as u32;
        if let Operand::Address {
            page_crossed: true, ..
        } = operand
        {
            if instruction.operation.page_penalty() {
                cycles += 1;
            }
        }
        cycles += self.execute(instruction.operation, operand)?;

        self.total_cycles += cycles as u64;
        Ok(cycles)
    }

    pub fn nmi(&mut self) -> Result<(), BusError> {
        self.interrupt(NMI_VECTOR)
    }

    /// Maskable interrupt; ignored while the interrupt-disable flag is set.
    pub fn irq(&mut self) -> Result<(), BusError> {
        if self.status & FLAG_INTERRUPT_DISABLE != 0 {
            return Ok(());
        }
        self.interrupt(IRQ_VECTOR)
    }

    fn interrupt(&mut self, vector: u16) -> Result<(), BusError> {
        self.push((self.pc >> 8) as u8)?;
        self.push(self.pc as u8)?;

        let status = (self.status & !FLAG_BREAK) | FLAG_UNUSED;
        self.push(status)?;

        self.status |= FLAG_INTERRUPT_DISABLE;
        self.pc = self.read_word(vector);

        self.remaining += INTERRUPT_CYCLES;
        self.total_cycles += INTERRUPT_CYCLES as u64;
        Ok(())
    }

    fn fetch_byte(&mut self) -> u8 {
        let byte = self.bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    fn fetch_word(&mut self) -> u16 {
        let lo = self.fetch_byte() as u16;
        let hi = self.fetch_byte() as u16;
        (hi << 8) | lo
    }

    fn read_word(&mut self, addr: u16) -> u16 {
        let lo = self.bus.read(addr) as u16;
        let hi = self.bus.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Reads a pointer from the zero page; the high byte wraps within it.
    fn read_zero_page_word(&mut self, ptr: u8) -> u16 {
        let lo = self.bus.read(ptr as u16) as u16;
        let hi = self.bus.read(ptr.wrapping_add(1) as u16) as u16;
        (hi << 8) | lo
    }

    fn trace(&mut self, pc: u16, opcode: u8, instruction: Instruction) {
        let mut bytes = format!("{:02X}", opcode);
        for i in 0..instruction.mode.operand_len() {
            let byte = self.bus.read(pc.wrapping_add(1 + i));
            bytes.push_str(&format!(" {:02X}", byte));
        }

        let mnemonic = instruction.operation.mnemonic();
        let mnemonic = if is_documented(opcode) {
            Green.paint(mnemonic)
        } else {
            Yellow.paint("*NOP")
        };

        println!(
            "{:04X}  {:<8}  {}  A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            pc, bytes, mnemonic, self.a, self.x, self.y, self.status, self.sp, self.total_cycles
        );
    }

    fn resolve(&mut self, mode: AddressingMode) -> Operand {
        let (addr, page_crossed) = match mode {
            AddressingMode::Implied => return Operand::Implied,
            AddressingMode::Accumulator => return Operand::Accumulator,
            AddressingMode::Immediate => {
                let addr = self.pc;
                self.pc = self.pc.wrapping_add(1);
                (addr, false)
            }
            AddressingMode::ZeroPage => (self.fetch_byte() as u16, false),
            AddressingMode::ZeroPageX => (self.fetch_byte().wrapping_add(self.x) as u16, false),
            AddressingMode::ZeroPageY => (self.fetch_byte().wrapping_add(self.y) as u16, false),
            AddressingMode::Relative => {
                let offset = self.fetch_byte() as i8;
                let next = self.pc;
                let target = next.wrapping_add(offset as u16);
                (target, (next & 0xFF00) != (target & 0xFF00))
            }
            AddressingMode::Absolute => (self.fetch_word(), false),
            AddressingMode::AbsoluteX => {
                let base = self.fetch_word();
                let addr = base.wrapping_add(self.x as u16);
                (addr, (base & 0xFF00) != (addr & 0xFF00))
            }
            AddressingMode::AbsoluteY => {
                let base = self.fetch_word();
                let addr = base.wrapping_add(self.y as u16);
                (addr, (base & 0xFF00) != (addr & 0xFF00))
            }
            AddressingMode::Indirect => {
                let ptr = self.fetch_word();
                // The high byte is fetched without carrying into the pointer's page.
                let lo = self.bus.read(ptr) as u16;
                let hi = self.bus.read((ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF)) as u16;
                ((hi << 8) | lo, false)
            }
            AddressingMode::IndexedIndirect => {
                let ptr = self.fetch_byte().wrapping_add(self.x);
                (self.read_zero_page_word(ptr), false)
            }
            AddressingMode::IndirectIndexed => {
                let ptr = self.fetch_byte();
                let base = self.read_zero_page_word(ptr);
                let addr = base.wrapping_add(self.y as u16);
                (addr, (base & 0xFF00) != (addr & 0xFF00))
            }
        };

        Operand::Address { addr, page_crossed }
    }

    fn load(&mut self, operand: Operand) -> u8 {
        match operand {
            Operand::Implied => 0,
            Operand::Accumulator => self.a,
            Operand::Address { addr, .. } => self.bus.read(addr),
        }
    }

    fn store(&mut self, operand: Operand, value: u8) -> Result<(), BusError> {
        match operand {
            Operand::Implied => Ok(()),
            Operand::Accumulator => {
                self.a = value;
                Ok(())
            }
            Operand::Address { addr, .. } => self.bus.write(addr, value),
        }
    }

    /// Runs `operation` and returns any cycles beyond the table cost (branches only).
    fn execute(&mut self, operation: Operation, operand: Operand) -> Result<u32, BusError> {
        use Operation::*;

        match operation {
            Lda => {
                self.a = self.load(operand);
                self.update_zero_and_negative_flags(self.a);
            }
            Ldx => {
                self.x = self.load(operand);
                self.update_zero_and_negative_flags(self.x);
            }
            Ldy => {
                self.y = self.load(operand);
                self.update_zero_and_negative_flags(self.y);
            }
            Sta => self.store(operand, self.a)?,
            Stx => self.store(operand, self.x)?,
            Sty => self.store(operand, self.y)?,

            Tax => {
                self.x = self.a;
                self.update_zero_and_negative_flags(self.x);
            }
            Tay => {
                self.y = self.a;
                self.update_zero_and_negative_flags(self.y);
            }
            Txa => {
                self.a = self.x;
                self.update_zero_and_negative_flags(self.a);
            }
            Tya => {
                self.a = self.y;
                self.update_zero_and_negative_flags(self.a);
            }
            Tsx => {
                self.x = self.sp;
                self.update_zero_and_negative_flags(self.x);
            }
            Txs => self.sp = self.x,

            Pha => self.push(self.a)?,
            Php => self.push(self.status | FLAG_BREAK | FLAG_UNUSED)?,
            Pla => {
                self.a = self.pop();
                self.update_zero_and_negative_flags(self.a);
            }
            Plp => {
                let value = self.pop();
                self.restore_status(value);
            }

            And => {
                self.a &= self.load(operand);
                self.update_zero_and_negative_flags(self.a);
            }
            Eor => {
                self.a ^= self.load(operand);
                self.update_zero_and_negative_flags(self.a);
            }
            Ora => {
                self.a |= self.load(operand);
                self.update_zero_and_negative_flags(self.a);
            }
            Bit => {
                let value = self.load(operand);
                self.set_flag(FLAG_ZERO, self.a & value == 0);
                self.set_flag(FLAG_NEGATIVE, value & 0x80 != 0);
                self.set_flag(FLAG_OVERFLOW, value & 0x40 != 0);
            }

            Adc => {
                let value = self.load(operand);
                self.add_with_carry(value);
            }
            Sbc => {
                // A - M - !C is A + !M + C in two's complement.
                let value = self.load(operand);
                self.add_with_carry(!value);
            }
            Cmp => {
                let value = self.load(operand);
                self.compare(self.a, value);
            }
            Cpx => {
                let value = self.load(operand);
                self.compare(self.x, value);
            }
            Cpy => {
                let value = self.load(operand);
                self.compare(self.y, value);
            }

            Inc => {
                let value = self.load(operand).wrapping_add(1);
                self.store(operand, value)?;
                self.update_zero_and_negative_flags(value);
            }
            Dec => {
                let value = self.load(operand).wrapping_sub(1);
                self.store(operand, value)?;
                self.update_zero_and_negative_flags(value);
            }
            Inx => {
                self.x = self.x.wrapping_add(1);
                self.update_zero_and_negative_flags(self.x);
            }
            Iny => {
                self.y = self.y.wrapping_add(1);
                self.update_zero_and_negative_flags(self.y);
            }
            Dex => {
                self.x = self.x.wrapping_sub(1);
                self.update_zero_and_negative_flags(self.x);
            }
            Dey => {
                self.y = self.y.wrapping_sub(1);
                self.update_zero_and_negative_flags(self.y);
            }

            Asl => {
                let value = self.load(operand);
                let result = value << 1;
                self.set_flag(FLAG_CARRY, value & 0x80 != 0);
                self.store(operand, result)?;
                self.update_zero_and_negative_flags(result);
            }
            Lsr => {
                let value = self.load(operand);
                let result = value >> 1;
                self.set_flag(FLAG_CARRY, value & 0x01 != 0);
                self.store(operand, result)?;
                self.update_zero_and_negative_flags(result);
            }
            Rol => {
                let value = self.load(operand);
                let result = (value << 1) | (self.status & FLAG_CARRY);
                self.set_flag(FLAG_CARRY, value & 0x80 != 0);
                self.store(operand, result)?;
                self.update_zero_and_negative_flags(result);
            }
            Ror => {
                let value = self.load(operand);
                let carry_in = if self.status & FLAG_CARRY != 0 { 0x80 } else { 0 };
                let result = (value >> 1) | carry_in;
                self.set_flag(FLAG_CARRY, value & 0x01 != 0);
                self.store(operand, result)?;
                self.update_zero_and_negative_flags(result);
            }

            Jmp => {
                if let Operand::Address { addr, .. } = operand {
                    self.pc = addr;
                }
            }
            Jsr => {
                if let Operand::Address { addr, .. } = operand {
                    let ret = self.pc.wrapping_sub(1);
                    self.push((ret >> 8) as u8)?;
                    self.push(ret as u8)?;
                    self.pc = addr;
                }
            }
            Rts => {
                let lo = self.pop() as u16;
                let hi = self.pop() as u16;
                self.pc = ((hi << 8) | lo).wrapping_add(1);
            }

            Bcc => return Ok(self.branch(self.status & FLAG_CARRY == 0, operand)),
            Bcs => return Ok(self.branch(self.status & FLAG_CARRY != 0, operand)),
            Bne => return Ok(self.branch(self.status & FLAG_ZERO == 0, operand)),
            Beq => return Ok(self.branch(self.status & FLAG_ZERO != 0, operand)),
            Bpl => return Ok(self.branch(self.status & FLAG_NEGATIVE == 0, operand)),
            Bmi => return Ok(self.branch(self.status & FLAG_NEGATIVE != 0, operand)),
            Bvc => return Ok(self.branch(self.status & FLAG_OVERFLOW == 0, operand)),
            Bvs => return Ok(self.branch(self.status & FLAG_OVERFLOW != 0, operand)),

            Clc => self.status &= !FLAG_CARRY,
            Cld => self.status &= !FLAG_DECIMAL,
            Cli => self.status &= !FLAG_INTERRUPT_DISABLE,
            Clv => self.status &= !FLAG_OVERFLOW,
            Sec => self.status |= FLAG_CARRY,
            Sed => self.status |= FLAG_DECIMAL,
            Sei => self.status |= FLAG_INTERRUPT_DISABLE,

            Brk => {
                // The byte after BRK is padding; the return address skips it.
                self.pc = self.pc.wrapping_add(1);
                self.push((self.pc >> 8) as u8)?;
                self.push(self.pc as u8)?;
                self.push(self.status | FLAG_BREAK | FLAG_UNUSED)?;

                self.status |= FLAG_INTERRUPT_DISABLE;
                self.pc = self.read_word(IRQ_VECTOR);
            }
            Rti => {
                let value = self.pop();
                self.restore_status(value);
                let lo = self.pop() as u16;
                let hi = self.pop() as u16;
                self.pc = (hi << 8) | lo;
            }
            Nop => {}
        }

        Ok(0)
    }

    fn add_with_carry(&mut self, value: u8) {
        let carry_in = (self.status & FLAG_CARRY) as u16;
        let sum = self.a as u16 + value as u16 + carry_in;
        let result = sum as u8;

        self.set_flag(FLAG_CARRY, sum > 0xFF);
        self.set_flag(
            FLAG_OVERFLOW,
            (!(self.a ^ value) & (self.a ^ result) & 0x80) != 0,
        );

        self.a = result;
        self.update_zero_and_negative_flags(self.a);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.set_flag(FLAG_CARRY, register >= value);
        self.update_zero_and_negative_flags(register.wrapping_sub(value));
    }

    /// +1 cycle when taken, +1 more when the target sits on another page.
    fn branch(&mut self, condition: bool, operand: Operand) -> u32 {
        let Operand::Address { addr, page_crossed } = operand else {
            return 0;
        };
        if !condition {
            return 0;
        }

        self.pc = addr;
        if page_crossed { 2 } else { 1 }
    }

    fn restore_status(&mut self, value: u8) {
        self.status = (value & !FLAG_BREAK) | FLAG_UNUSED;
    }

    fn set_flag(&mut self, flag: u8, on: bool) {
        if on {
            self.status |= flag;
        } else {
            self.status &= !flag;
        }
    }

    fn update_zero_and_negative_flags(&mut self, value: u8) {
        self.set_flag(FLAG_ZERO, value == 0);
        self.set_flag(FLAG_NEGATIVE, value & 0x80 != 0);
    }

    fn push(&mut self, value: u8) -> Result<(), BusError> {
        let addr = 0x0100 | self.sp as u16;
        self.bus.write(addr, value)?;
        self.sp = self.sp.wrapping_sub(1);
        Ok(())
    }

    fn pop(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        let addr = 0x0100 | self.sp as u16;
        self.bus.read(addr)
    }
}
